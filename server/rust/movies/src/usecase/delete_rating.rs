use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::repository::RatingRepository;
use crate::infrastructure::cache::OutputCache;

use super::error::CatalogError;

pub struct DeleteRatingUseCase {
    ratings: Arc<dyn RatingRepository>,
    cache: Arc<OutputCache>,
}

impl DeleteRatingUseCase {
    pub fn new(ratings: Arc<dyn RatingRepository>, cache: Arc<OutputCache>) -> Self {
        Self { ratings, cache }
    }

    pub async fn execute(&self, movie_id: Uuid, user_id: Uuid) -> Result<(), CatalogError> {
        if !self.ratings.delete_rating(movie_id, user_id).await? {
            return Err(CatalogError::NotFound(movie_id.to_string()));
        }

        info!(movie_id = %movie_id, user_id = %user_id, "rating deleted");
        self.cache.invalidate_movies().await;
        Ok(())
    }
}
