use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::repository::MovieRepository;
use crate::infrastructure::cache::OutputCache;

use super::error::CatalogError;

pub struct DeleteMovieUseCase {
    repo: Arc<dyn MovieRepository>,
    cache: Arc<OutputCache>,
}

impl DeleteMovieUseCase {
    pub fn new(repo: Arc<dyn MovieRepository>, cache: Arc<OutputCache>) -> Self {
        Self { repo, cache }
    }

    pub async fn execute(&self, id: Uuid) -> Result<(), CatalogError> {
        if !self.repo.delete_by_id(id).await? {
            return Err(CatalogError::NotFound(id.to_string()));
        }

        info!(movie_id = %id, "movie deleted");
        self.cache.invalidate_movies().await;
        Ok(())
    }
}
