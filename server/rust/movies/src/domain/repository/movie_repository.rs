use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entity::{Movie, MovieQuery};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MovieRepository: Send + Sync {
    async fn create(&self, movie: &Movie) -> anyhow::Result<bool>;
    /// `user_id` を渡すとその利用者の評価を `user_rating` に埋める。
    async fn get_by_id(&self, id: Uuid, user_id: Option<Uuid>) -> anyhow::Result<Option<Movie>>;
    async fn get_by_slug(&self, slug: &str, user_id: Option<Uuid>)
        -> anyhow::Result<Option<Movie>>;
    async fn get_all(&self, query: &MovieQuery) -> anyhow::Result<Vec<Movie>>;
    /// ページングを無視した絞り込み後の総件数。
    async fn count(&self, query: &MovieQuery) -> anyhow::Result<u64>;
    async fn update(&self, movie: &Movie) -> anyhow::Result<bool>;
    async fn delete_by_id(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn exists_by_id(&self, id: Uuid) -> anyhow::Result<bool>;
}
