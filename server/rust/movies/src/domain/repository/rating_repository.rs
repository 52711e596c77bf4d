use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entity::MovieRating;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RatingRepository: Send + Sync {
    /// 評価を登録または上書きする。映画が存在しなければ false。
    async fn rate(&self, movie_id: Uuid, rating: i32, user_id: Uuid) -> anyhow::Result<bool>;
    async fn delete_rating(&self, movie_id: Uuid, user_id: Uuid) -> anyhow::Result<bool>;
    async fn get_ratings_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<MovieRating>>;
}
