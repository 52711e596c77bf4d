use std::sync::Arc;

use uuid::Uuid;

use crate::domain::entity::Movie;
use crate::domain::repository::MovieRepository;

use super::error::CatalogError;

pub struct GetMovieUseCase {
    repo: Arc<dyn MovieRepository>,
}

impl GetMovieUseCase {
    pub fn new(repo: Arc<dyn MovieRepository>) -> Self {
        Self { repo }
    }

    /// UUID として解釈できれば ID で、できなければスラッグで検索する。
    pub async fn execute(
        &self,
        id_or_slug: &str,
        user_id: Option<Uuid>,
    ) -> Result<Movie, CatalogError> {
        let found = match Uuid::parse_str(id_or_slug) {
            Ok(id) => self.repo.get_by_id(id, user_id).await?,
            Err(_) => self.repo.get_by_slug(id_or_slug, user_id).await?,
        };
        found.ok_or_else(|| CatalogError::NotFound(id_or_slug.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::movie_repository::MockMovieRepository;

    #[tokio::test]
    async fn test_lookup_by_id() {
        let movie = Movie::new("Heat".into(), 1995, vec!["Crime".into()]);
        let id = movie.id;
        let returned = movie.clone();

        let mut mock = MockMovieRepository::new();
        mock.expect_get_by_id()
            .withf(move |got, user| *got == id && user.is_none())
            .returning(move |_, _| Ok(Some(returned.clone())));
        mock.expect_get_by_slug().never();

        let uc = GetMovieUseCase::new(Arc::new(mock));
        let found = uc.execute(&id.to_string(), None).await.unwrap();
        assert_eq!(found.id, id);
    }

    #[tokio::test]
    async fn test_lookup_by_slug_passes_user() {
        let user = Uuid::new_v4();
        let mut mock = MockMovieRepository::new();
        mock.expect_get_by_slug()
            .withf(move |slug, got| slug == "heat-1995" && *got == Some(user))
            .returning(|_, _| {
                let mut movie = Movie::new("Heat".into(), 1995, vec!["Crime".into()]);
                movie.user_rating = Some(4);
                Ok(Some(movie))
            });

        let uc = GetMovieUseCase::new(Arc::new(mock));
        let found = uc.execute("heat-1995", Some(user)).await.unwrap();
        assert_eq!(found.user_rating, Some(4));
    }

    #[tokio::test]
    async fn test_not_found() {
        let mut mock = MockMovieRepository::new();
        mock.expect_get_by_slug().returning(|_, _| Ok(None));

        let uc = GetMovieUseCase::new(Arc::new(mock));
        let result = uc.execute("missing-2000", None).await;
        assert!(matches!(result, Err(CatalogError::NotFound(s)) if s == "missing-2000"));
    }
}
