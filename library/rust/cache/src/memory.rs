use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{CacheEntry, CacheError, CacheKey, CacheTag, OutputCacheStore};

/// 既定の最大エントリ数。
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, Arc<CacheEntry>>,
    tags: HashMap<CacheTag, HashSet<CacheKey>>,
}

impl Inner {
    fn unlink(&mut self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let entry = self.entries.remove(key)?;
        for tag in &entry.tags {
            if let Some(keys) = self.tags.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tags.remove(tag);
                }
            }
        }
        Some(entry)
    }

    fn purge_expired(&mut self) -> usize {
        let expired: Vec<CacheKey> = self
            .entries
            .values()
            .filter(|e| e.is_expired())
            .map(|e| e.key.clone())
            .collect();
        for key in &expired {
            self.unlink(key);
        }
        expired.len()
    }

    /// 満杯なら期限切れを掃除し、それでも満杯なら最も早く失効するエントリを追い出す。
    fn make_room(&mut self, max_entries: usize) {
        if self.entries.len() < max_entries {
            return;
        }
        self.purge_expired();
        while self.entries.len() >= max_entries {
            let victim = self
                .entries
                .values()
                .min_by_key(|e| e.expires_at)
                .map(|e| e.key.clone());
            match victim {
                Some(key) => {
                    self.unlink(&key);
                }
                None => break,
            }
        }
    }
}

/// InMemoryOutputCacheStore はプロセス内のタグ付きキャッシュストア。
///
/// エントリ本体とタグ索引を 1 つの RwLock で守るため、タグ無効化は
/// 並行する読み取りから見て一括で反映される。
#[derive(Clone)]
pub struct InMemoryOutputCacheStore {
    inner: Arc<RwLock<Inner>>,
    max_entries: usize,
}

impl InMemoryOutputCacheStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            max_entries: max_entries.max(1),
        }
    }

    /// 期限切れを含む保持エントリ数。
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// 指定タグに索引されているキー数。
    pub async fn tagged_count(&self, tag: &CacheTag) -> usize {
        self.inner
            .read()
            .await
            .tags
            .get(tag)
            .map_or(0, |keys| keys.len())
    }
}

impl Default for InMemoryOutputCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputCacheStore for InMemoryOutputCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Arc<CacheEntry>>, CacheError> {
        let inner = self.inner.read().await;
        match inner.entries.get(key) {
            Some(entry) if !entry.is_expired() => Ok(Some(entry.clone())),
            // 期限切れは次の書き込み時に掃除される
            _ => Ok(None),
        }
    }

    async fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let mut inner = self.inner.write().await;
        inner.unlink(&entry.key);
        inner.make_room(self.max_entries);

        let key = entry.key.clone();
        for tag in &entry.tags {
            inner
                .tags
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        inner.entries.insert(key, Arc::new(entry));
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let mut inner = self.inner.write().await;
        Ok(inner.unlink(key).is_some())
    }

    async fn evict_by_tag(&self, tag: &CacheTag) -> Result<usize, CacheError> {
        let mut inner = self.inner.write().await;
        let Some(keys) = inner.tags.remove(tag) else {
            return Ok(0);
        };
        let count = keys.len();
        for key in &keys {
            inner.unlink(key);
        }
        Ok(count)
    }
}
