use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entity::{Movie, MovieQuery, MovieRating, SortField, SortOrder};
use crate::domain::repository::{MovieRepository, RatingRepository};

#[derive(Default)]
struct CatalogState {
    /// 登録順を保つ。
    movies: Vec<Movie>,
    /// (movie_id, user_id) -> rating
    ratings: HashMap<(Uuid, Uuid), i32>,
}

impl CatalogState {
    fn position(&self, id: Uuid) -> Option<usize> {
        self.movies.iter().position(|m| m.id == id)
    }

    /// 平均評価と利用者自身の評価を埋めた複製を返す。
    fn hydrate(&self, movie: &Movie, user_id: Option<Uuid>) -> Movie {
        let scores: Vec<i32> = self
            .ratings
            .iter()
            .filter(|((movie_id, _), _)| *movie_id == movie.id)
            .map(|(_, rating)| *rating)
            .collect();

        let mut hydrated = movie.clone();
        hydrated.rating = if scores.is_empty() {
            None
        } else {
            let avg = scores.iter().sum::<i32>() as f32 / scores.len() as f32;
            Some((avg * 10.0).round() / 10.0)
        };
        hydrated.user_rating =
            user_id.and_then(|uid| self.ratings.get(&(movie.id, uid)).copied());
        hydrated
    }

    fn matches(movie: &Movie, query: &MovieQuery) -> bool {
        let title_ok = query.title.as_deref().map_or(true, |t| {
            movie
                .title
                .to_lowercase()
                .contains(&t.to_lowercase())
        });
        let year_ok = query.year.map_or(true, |y| movie.year_of_release == y);
        title_ok && year_ok
    }
}

/// InMemoryCatalogRepository は映画と評価をプロセス内に保持するリポジトリ。
///
/// 開発環境と統合テストで使用する。
pub struct InMemoryCatalogRepository {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CatalogState::default()),
        }
    }
}

impl Default for InMemoryCatalogRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MovieRepository for InMemoryCatalogRepository {
    async fn create(&self, movie: &Movie) -> anyhow::Result<bool> {
        let mut state = self.state.write().await;
        if state.position(movie.id).is_some() {
            return Ok(false);
        }
        let mut stored = movie.clone();
        stored.rating = None;
        stored.user_rating = None;
        state.movies.push(stored);
        Ok(true)
    }

    async fn get_by_id(&self, id: Uuid, user_id: Option<Uuid>) -> anyhow::Result<Option<Movie>> {
        let state = self.state.read().await;
        Ok(state
            .movies
            .iter()
            .find(|m| m.id == id)
            .map(|m| state.hydrate(m, user_id)))
    }

    async fn get_by_slug(
        &self,
        slug: &str,
        user_id: Option<Uuid>,
    ) -> anyhow::Result<Option<Movie>> {
        let state = self.state.read().await;
        Ok(state
            .movies
            .iter()
            .find(|m| m.slug() == slug)
            .map(|m| state.hydrate(m, user_id)))
    }

    async fn get_all(&self, query: &MovieQuery) -> anyhow::Result<Vec<Movie>> {
        let state = self.state.read().await;
        let mut movies: Vec<&Movie> = state
            .movies
            .iter()
            .filter(|m| CatalogState::matches(m, query))
            .collect();

        if let Some((field, order)) = query.sort {
            movies.sort_by(|a, b| {
                let ord = match field {
                    SortField::Title => a.title.cmp(&b.title),
                    SortField::YearOfRelease => a.year_of_release.cmp(&b.year_of_release),
                };
                match order {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            });
        }

        Ok(movies
            .into_iter()
            .skip(query.offset())
            .take(query.page_size as usize)
            .map(|m| state.hydrate(m, query.user_id))
            .collect())
    }

    async fn count(&self, query: &MovieQuery) -> anyhow::Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .movies
            .iter()
            .filter(|m| CatalogState::matches(m, query))
            .count() as u64)
    }

    async fn update(&self, movie: &Movie) -> anyhow::Result<bool> {
        let mut state = self.state.write().await;
        let Some(pos) = state.position(movie.id) else {
            return Ok(false);
        };
        let stored = &mut state.movies[pos];
        stored.title = movie.title.clone();
        stored.year_of_release = movie.year_of_release;
        stored.genres = movie.genres.clone();
        Ok(true)
    }

    async fn delete_by_id(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut state = self.state.write().await;
        let Some(pos) = state.position(id) else {
            return Ok(false);
        };
        state.movies.remove(pos);
        state.ratings.retain(|(movie_id, _), _| *movie_id != id);
        Ok(true)
    }

    async fn exists_by_id(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.state.read().await.position(id).is_some())
    }
}

#[async_trait]
impl RatingRepository for InMemoryCatalogRepository {
    async fn rate(&self, movie_id: Uuid, rating: i32, user_id: Uuid) -> anyhow::Result<bool> {
        let mut state = self.state.write().await;
        if state.position(movie_id).is_none() {
            return Ok(false);
        }
        state.ratings.insert((movie_id, user_id), rating);
        Ok(true)
    }

    async fn delete_rating(&self, movie_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.ratings.remove(&(movie_id, user_id)).is_some())
    }

    async fn get_ratings_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<MovieRating>> {
        let state = self.state.read().await;
        Ok(state
            .movies
            .iter()
            .filter_map(|m| {
                state.ratings.get(&(m.id, user_id)).map(|r| MovieRating {
                    movie_id: m.id,
                    slug: m.slug(),
                    rating: *r,
                })
            })
            .collect())
    }
}
