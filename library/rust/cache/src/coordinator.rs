//! 読み取りキャッシュと更新処理の整合性を保つコーディネーター。

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{CacheEntry, CacheError, CacheKey, CacheTag, OutputCacheStore};

/// 既定のエントリ生存時間。
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// CacheStatus はレスポンスがキャッシュから返されたかを表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// CachedPayload は get_or_compute の結果。
#[derive(Debug, Clone)]
pub struct CachedPayload {
    pub payload: Vec<u8>,
    pub status: CacheStatus,
}

/// CacheConsistencyCoordinator は出力キャッシュの読み取りと無効化を仲介する。
///
/// タグごとに世代番号を持ち、無効化のたびに進める。ミス後の計算中に
/// 同じタグの無効化が走った場合、その計算結果は保存しない。
/// 世代の比較と保存は `generations` の読み取りロック下で行い、無効化は
/// 書き込みロック下で世代更新と削除を行うため、無効化が戻った後に
/// 古い計算結果が読める状態は生じない。
pub struct CacheConsistencyCoordinator {
    store: Arc<dyn OutputCacheStore>,
    ttl: Duration,
    generations: RwLock<HashMap<CacheTag, u64>>,
}

impl CacheConsistencyCoordinator {
    pub fn new(store: Arc<dyn OutputCacheStore>) -> Self {
        Self::with_ttl(store, DEFAULT_TTL)
    }

    pub fn with_ttl(store: Arc<dyn OutputCacheStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            generations: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// キャッシュ済みペイロードを返す。なければ `compute` を実行して保存する。
    ///
    /// `compute` が Err を返した場合は何も保存せずにそのまま返す。
    /// ストアの読み書き失敗はミス扱いとし、計算結果はそのまま返す。
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: CacheKey,
        tags: &[CacheTag],
        compute: F,
    ) -> Result<CachedPayload, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        match self.store.get(&key).await {
            Ok(Some(entry)) => {
                debug!(key = %key, "output cache hit");
                return Ok(CachedPayload {
                    payload: entry.payload.clone(),
                    status: CacheStatus::Hit,
                });
            }
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "output cache read failed"),
        }

        let snapshot = self.snapshot(tags).await;
        let payload = compute().await?;

        self.fill(key, tags, &snapshot, payload.clone()).await;

        Ok(CachedPayload {
            payload,
            status: CacheStatus::Miss,
        })
    }

    /// タグを持つ全エントリを削除する。戻った時点で該当エントリは読めない。
    pub async fn invalidate(&self, tag: &CacheTag) -> Result<usize, CacheError> {
        let mut generations = self.generations.write().await;
        *generations.entry(tag.clone()).or_insert(0) += 1;

        let removed = self.store.evict_by_tag(tag).await.map_err(|e| match e {
            CacheError::InvalidationFailed { .. } => e,
            other => CacheError::InvalidationFailed {
                tag: tag.to_string(),
                reason: other.to_string(),
            },
        })?;

        debug!(tag = %tag, removed, "output cache tag invalidated");
        Ok(removed)
    }

    async fn snapshot(&self, tags: &[CacheTag]) -> Vec<u64> {
        let generations = self.generations.read().await;
        tags.iter()
            .map(|t| generations.get(t).copied().unwrap_or(0))
            .collect()
    }

    async fn fill(&self, key: CacheKey, tags: &[CacheTag], snapshot: &[u64], payload: Vec<u8>) {
        let generations = self.generations.read().await;
        let unchanged = tags
            .iter()
            .zip(snapshot)
            .all(|(t, g)| generations.get(t).copied().unwrap_or(0) == *g);
        if !unchanged {
            debug!(key = %key, "skipping output cache fill invalidated during compute");
            return;
        }

        let entry = CacheEntry::new(key.clone(), payload, tags.to_vec(), self.ttl);
        if let Err(e) = self.store.set(entry).await {
            warn!(key = %key, error = %e, "output cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockOutputCacheStore;
    use crate::{InMemoryOutputCacheStore, QuerySignature};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key() -> CacheKey {
        QuerySignature::new("/api/movies").param("page", 1).into_key()
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let coordinator =
            CacheConsistencyCoordinator::new(Arc::new(InMemoryOutputCacheStore::new()));
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let compute = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(b"payload".to_vec())
        };

        let first = coordinator
            .get_or_compute(key(), &[CacheTag::movies()], compute)
            .await
            .unwrap();
        let second = coordinator
            .get_or_compute(key(), &[CacheTag::movies()], compute)
            .await
            .unwrap();

        assert_eq!(first.status, CacheStatus::Miss);
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(second.payload, b"payload");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_compute_error_is_not_cached() {
        let store = Arc::new(InMemoryOutputCacheStore::new());
        let coordinator = CacheConsistencyCoordinator::new(store.clone());

        let result = coordinator
            .get_or_compute(key(), &[CacheTag::movies()], || async {
                Err::<Vec<u8>, _>("boom")
            })
            .await;

        assert!(result.is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_failures_degrade_to_miss() {
        let mut store = MockOutputCacheStore::new();
        store
            .expect_get()
            .returning(|_| Err(CacheError::ConnectionError("down".into())));
        store
            .expect_set()
            .returning(|_| Err(CacheError::ConnectionError("down".into())));
        let coordinator = CacheConsistencyCoordinator::new(Arc::new(store));

        let result = coordinator
            .get_or_compute(key(), &[CacheTag::movies()], || async {
                Ok::<_, ()>(b"fresh".to_vec())
            })
            .await
            .unwrap();

        assert_eq!(result.status, CacheStatus::Miss);
        assert_eq!(result.payload, b"fresh");
    }

    #[tokio::test]
    async fn test_invalidate_wraps_store_error() {
        let mut store = MockOutputCacheStore::new();
        store
            .expect_evict_by_tag()
            .returning(|_| Err(CacheError::ConnectionError("down".into())));
        let coordinator = CacheConsistencyCoordinator::new(Arc::new(store));

        let err = coordinator.invalidate(&CacheTag::movies()).await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidationFailed { ref tag, .. } if tag == "movies"));
    }

    #[tokio::test]
    async fn test_fill_skipped_when_invalidated_during_compute() {
        let store = Arc::new(InMemoryOutputCacheStore::new());
        let coordinator = Arc::new(CacheConsistencyCoordinator::new(store.clone()));

        let inner = coordinator.clone();
        let result = coordinator
            .get_or_compute(key(), &[CacheTag::movies()], || async move {
                // 計算中に更新処理が走ったことを模す
                inner.invalidate(&CacheTag::movies()).await.unwrap();
                Ok::<_, ()>(b"stale".to_vec())
            })
            .await
            .unwrap();

        assert_eq!(result.payload, b"stale");
        assert!(store.get(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unrelated_tag_invalidation_does_not_block_fill() {
        let store = Arc::new(InMemoryOutputCacheStore::new());
        let coordinator = Arc::new(CacheConsistencyCoordinator::new(store.clone()));

        let inner = coordinator.clone();
        coordinator
            .get_or_compute(key(), &[CacheTag::movies()], || async move {
                inner.invalidate(&CacheTag::new("ratings")).await.unwrap();
                Ok::<_, ()>(b"fresh".to_vec())
            })
            .await
            .unwrap();

        assert!(store.get(&key()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_ttl_expires_without_invalidation() {
        let coordinator = CacheConsistencyCoordinator::with_ttl(
            Arc::new(InMemoryOutputCacheStore::new()),
            Duration::from_millis(30),
        );
        let compute = || async { Ok::<_, ()>(b"v".to_vec()) };

        coordinator
            .get_or_compute(key(), &[CacheTag::movies()], compute)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        let again = coordinator
            .get_or_compute(key(), &[CacheTag::movies()], compute)
            .await
            .unwrap();

        assert_eq!(again.status, CacheStatus::Miss);
    }
}
