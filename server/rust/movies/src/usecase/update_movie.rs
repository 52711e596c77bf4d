use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::entity::Movie;
use crate::domain::repository::MovieRepository;
use crate::infrastructure::cache::OutputCache;

use super::error::CatalogError;
use super::validation::validate_movie;

#[derive(Debug, Clone)]
pub struct UpdateMovieInput {
    pub id: Uuid,
    pub title: String,
    pub year_of_release: i32,
    pub genres: Vec<String>,
}

pub struct UpdateMovieUseCase {
    repo: Arc<dyn MovieRepository>,
    cache: Arc<OutputCache>,
}

impl UpdateMovieUseCase {
    pub fn new(repo: Arc<dyn MovieRepository>, cache: Arc<OutputCache>) -> Self {
        Self { repo, cache }
    }

    /// 更新後の映画を、呼び出したユーザーの評価付きで返す。
    pub async fn execute(
        &self,
        input: UpdateMovieInput,
        user_id: Option<Uuid>,
    ) -> Result<Movie, CatalogError> {
        let movie = Movie::with_id(input.id, input.title, input.year_of_release, input.genres);

        if !self.repo.exists_by_id(movie.id).await? {
            return Err(CatalogError::NotFound(movie.id.to_string()));
        }

        validate_movie(&movie, self.repo.as_ref()).await?;

        if !self.repo.update(&movie).await? {
            return Err(CatalogError::NotFound(movie.id.to_string()));
        }

        info!(movie_id = %movie.id, "movie updated");
        self.cache.invalidate_movies().await;

        self.repo
            .get_by_id(movie.id, user_id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(movie.id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::movie_repository::MockMovieRepository;
    use crate::usecase::test_support::{is_primed, output_cache, prime};

    fn input(id: Uuid) -> UpdateMovieInput {
        UpdateMovieInput {
            id,
            title: "Heat".into(),
            year_of_release: 1995,
            genres: vec!["Crime".into(), "Thriller".into()],
        }
    }

    #[tokio::test]
    async fn test_success_invalidates_and_returns_hydrated() {
        let id = Uuid::new_v4();
        let mut mock = MockMovieRepository::new();
        mock.expect_exists_by_id().returning(|_| Ok(true));
        mock.expect_get_by_slug().returning(|_, _| Ok(None));
        mock.expect_update().times(1).returning(|_| Ok(true));
        mock.expect_get_by_id().returning(move |_, _| {
            let mut movie = Movie::with_id(id, "Heat".into(), 1995, vec!["Crime".into()]);
            movie.rating = Some(4.5);
            Ok(Some(movie))
        });

        let cache = output_cache();
        prime(&cache).await;

        let uc = UpdateMovieUseCase::new(Arc::new(mock), cache.clone());
        let movie = uc.execute(input(id), None).await.unwrap();
        assert_eq!(movie.rating, Some(4.5));
        assert!(!is_primed(&cache).await);
    }

    #[tokio::test]
    async fn test_missing_movie_is_not_found_and_keeps_cache() {
        let mut mock = MockMovieRepository::new();
        mock.expect_exists_by_id().returning(|_| Ok(false));
        mock.expect_update().never();

        let cache = output_cache();
        prime(&cache).await;

        let uc = UpdateMovieUseCase::new(Arc::new(mock), cache.clone());
        let result = uc.execute(input(Uuid::new_v4()), None).await;
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
        assert!(is_primed(&cache).await);
    }

    #[tokio::test]
    async fn test_slug_taken_by_another_movie() {
        let mut mock = MockMovieRepository::new();
        mock.expect_exists_by_id().returning(|_| Ok(true));
        mock.expect_get_by_slug()
            .returning(|_, _| Ok(Some(Movie::new("Heat".into(), 1995, vec!["Crime".into()]))));
        mock.expect_update().never();

        let uc = UpdateMovieUseCase::new(Arc::new(mock), output_cache());
        let result = uc.execute(input(Uuid::new_v4()), None).await;
        assert!(matches!(result, Err(CatalogError::SlugConflict(_))));
    }
}
