use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::repository::RatingRepository;
use crate::infrastructure::cache::OutputCache;

use super::error::CatalogError;
use super::validation::validate_rating;

pub struct RateMovieUseCase {
    ratings: Arc<dyn RatingRepository>,
    cache: Arc<OutputCache>,
}

impl RateMovieUseCase {
    pub fn new(ratings: Arc<dyn RatingRepository>, cache: Arc<OutputCache>) -> Self {
        Self { ratings, cache }
    }

    /// 評価を登録する。同じユーザーの既存評価は上書きされる。
    pub async fn execute(
        &self,
        movie_id: Uuid,
        rating: i32,
        user_id: Uuid,
    ) -> Result<(), CatalogError> {
        validate_rating(rating)?;

        if !self.ratings.rate(movie_id, rating, user_id).await? {
            return Err(CatalogError::NotFound(movie_id.to_string()));
        }

        info!(movie_id = %movie_id, user_id = %user_id, rating, "movie rated");
        // 平均評価は一覧と詳細の両方に含まれる
        self.cache.invalidate_movies().await;
        Ok(())
    }
}
