use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::{CacheError, CacheKey, CacheTag};

/// CacheEntry はキャッシュ済みのレスポンスペイロード。
///
/// ミス時に生成され、TTL 経過かタグ無効化で破棄される。内容は更新しない。
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: Vec<u8>,
    pub tags: Vec<CacheTag>,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn new(key: CacheKey, payload: Vec<u8>, tags: Vec<CacheTag>, ttl: Duration) -> Self {
        Self {
            key,
            payload,
            tags,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Instant::now()
    }

    pub fn has_tag(&self, tag: &CacheTag) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// OutputCacheStore はタグ索引付きのエントリストア。
///
/// `evict_by_tag` は並行する `get` に対して一括で見えなければならない
/// （途中まで削除された状態を読み取りに見せない）。
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait OutputCacheStore: Send + Sync {
    /// 期限切れでないエントリを返す。
    async fn get(&self, key: &CacheKey) -> Result<Option<Arc<CacheEntry>>, CacheError>;
    /// エントリを置き換える。同じキーの既存エントリはタグ索引からも外す。
    async fn set(&self, entry: CacheEntry) -> Result<(), CacheError>;
    async fn remove(&self, key: &CacheKey) -> Result<bool, CacheError>;
    /// タグを持つエントリをすべて削除し、削除件数を返す。
    async fn evict_by_tag(&self, tag: &CacheTag) -> Result<usize, CacheError>;
}
