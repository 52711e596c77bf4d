//! movies-cache: タグ付き出力キャッシュと書き込み時の整合性制御
//!
//! 読み取り結果をクエリシグネチャ単位でキャッシュし、更新系の処理が
//! [`CacheConsistencyCoordinator::invalidate`] でタグごとまとめて無効化する。

pub mod coordinator;
pub mod error;
pub mod key;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;
pub mod store;

pub use coordinator::{CacheConsistencyCoordinator, CacheStatus, CachedPayload};
pub use error::CacheError;
pub use key::{CacheKey, CacheTag, QuerySignature, MOVIES_TAG};
pub use memory::InMemoryOutputCacheStore;
pub use store::{CacheEntry, OutputCacheStore};

#[cfg(feature = "mock")]
pub use store::MockOutputCacheStore;
