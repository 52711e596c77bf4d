use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::entity::Movie;
use crate::domain::repository::MovieRepository;
use crate::infrastructure::cache::OutputCache;

use super::error::CatalogError;
use super::validation::validate_movie;

#[derive(Debug, Clone)]
pub struct CreateMovieInput {
    pub title: String,
    pub year_of_release: i32,
    pub genres: Vec<String>,
}

impl CreateMovieInput {
    fn into_movie(self) -> Movie {
        Movie::new(self.title, self.year_of_release, self.genres)
    }
}

pub struct CreateMovieUseCase {
    repo: Arc<dyn MovieRepository>,
    cache: Arc<OutputCache>,
}

impl CreateMovieUseCase {
    pub fn new(repo: Arc<dyn MovieRepository>, cache: Arc<OutputCache>) -> Self {
        Self { repo, cache }
    }

    pub async fn execute(&self, input: CreateMovieInput) -> Result<Movie, CatalogError> {
        let movie = input.into_movie();
        validate_movie(&movie, self.repo.as_ref()).await?;

        if !self.repo.create(&movie).await? {
            return Err(CatalogError::Internal(format!(
                "movie {} was not stored",
                movie.id
            )));
        }

        info!(movie_id = %movie.id, slug = %movie.slug(), "movie created");
        self.cache.invalidate_movies().await;
        Ok(movie)
    }

    /// 複数件を登録する。すべて検証してから登録し、無効化は最後に 1 回だけ行う。
    pub async fn execute_batch(&self, inputs: Vec<CreateMovieInput>) -> Result<usize, CatalogError> {
        let movies: Vec<Movie> = inputs.into_iter().map(CreateMovieInput::into_movie).collect();

        let mut seen = std::collections::HashSet::new();
        for movie in &movies {
            validate_movie(movie, self.repo.as_ref()).await?;
            // バッチ内の重複もストアの重複と同じ扱い
            let slug = movie.slug();
            if !seen.insert(slug.clone()) {
                return Err(CatalogError::SlugConflict(slug));
            }
        }

        let mut created = 0;
        let mut failure = None;
        for movie in &movies {
            match self.repo.create(movie).await {
                Ok(true) => created += 1,
                Ok(false) => {}
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        // 途中で失敗しても登録済みの分があれば無効化してからエラーを返す
        if created > 0 {
            self.cache.invalidate_movies().await;
        }
        if let Some(e) = failure {
            warn!(created, error = %e, "batch create stopped partway");
            return Err(e.into());
        }

        info!(created, "movies created in batch");
        Ok(created)
    }
}
