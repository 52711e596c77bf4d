use std::future::Future;
use std::sync::Arc;

use movies_cache::{CacheConsistencyCoordinator, CacheKey, CacheStatus, CacheTag, CachedPayload};
use movies_telemetry::Metrics;
use tracing::{debug, warn};

/// メトリクスで使うキャッシュ名。
const CACHE_NAME: &str = "output";

/// OutputCache は映画の読み取りレスポンスを "movies" タグ付きでキャッシュする。
///
/// 更新系ユースケースは成功後に [`OutputCache::invalidate_movies`] を呼ぶ。
/// 無効化に失敗しても更新処理自体は成功として扱い、TTL で古いエントリが消えるのを待つ。
pub struct OutputCache {
    coordinator: Arc<CacheConsistencyCoordinator>,
    metrics: Option<Arc<Metrics>>,
}

impl OutputCache {
    pub fn new(coordinator: Arc<CacheConsistencyCoordinator>) -> Self {
        Self {
            coordinator,
            metrics: None,
        }
    }

    pub fn with_metrics(coordinator: Arc<CacheConsistencyCoordinator>, metrics: Arc<Metrics>) -> Self {
        Self {
            coordinator,
            metrics: Some(metrics),
        }
    }

    /// キャッシュ済みのレスポンス本文を返す。なければ `compute` の結果を保存して返す。
    pub async fn get_or_compute<F, Fut, E>(&self, key: CacheKey, compute: F) -> Result<CachedPayload, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        let result = self
            .coordinator
            .get_or_compute(key, &[CacheTag::movies()], compute)
            .await?;

        if let Some(ref m) = self.metrics {
            match result.status {
                CacheStatus::Hit => m.record_cache_hit(CACHE_NAME),
                CacheStatus::Miss => m.record_cache_miss(CACHE_NAME),
            }
        }

        Ok(result)
    }

    /// "movies" タグのエントリをすべて無効化する。
    pub async fn invalidate_movies(&self) {
        let tag = CacheTag::movies();
        match self.coordinator.invalidate(&tag).await {
            Ok(removed) => {
                debug!(tag = %tag, removed, "movies output cache invalidated");
                if let Some(ref m) = self.metrics {
                    m.record_cache_invalidation(tag.as_str(), "ok");
                }
            }
            Err(e) => {
                warn!(
                    tag = %tag,
                    error = %e,
                    "output cache invalidation failed, stale entries expire by TTL"
                );
                if let Some(ref m) = self.metrics {
                    m.record_cache_invalidation(tag.as_str(), "failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use movies_cache::{InMemoryOutputCacheStore, QuerySignature};

    fn key() -> CacheKey {
        QuerySignature::new("/api/movies")
            .param("page", 1)
            .param("pageSize", 10)
            .into_key()
    }

    #[tokio::test]
    async fn test_hit_and_miss_are_recorded() {
        let metrics = Arc::new(Metrics::new("movies-server-test").unwrap());
        let coordinator = Arc::new(CacheConsistencyCoordinator::new(Arc::new(
            InMemoryOutputCacheStore::new(),
        )));
        let cache = OutputCache::with_metrics(coordinator, metrics.clone());

        let first = cache
            .get_or_compute(key(), || async { Ok::<_, ()>(b"[]".to_vec()) })
            .await
            .unwrap();
        let second = cache
            .get_or_compute(key(), || async { Ok::<_, ()>(b"changed".to_vec()) })
            .await
            .unwrap();

        assert_eq!(first.status, CacheStatus::Miss);
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(second.payload, b"[]".to_vec());
        assert_eq!(
            metrics.cache_hits_total.with_label_values(&[CACHE_NAME]).get(),
            1
        );
        assert_eq!(
            metrics.cache_misses_total.with_label_values(&[CACHE_NAME]).get(),
            1
        );
    }

    #[tokio::test]
    async fn test_invalidate_movies_drops_entries() {
        let metrics = Arc::new(Metrics::new("movies-server-test").unwrap());
        let coordinator = Arc::new(CacheConsistencyCoordinator::new(Arc::new(
            InMemoryOutputCacheStore::new(),
        )));
        let cache = OutputCache::with_metrics(coordinator, metrics.clone());

        cache
            .get_or_compute(key(), || async { Ok::<_, ()>(b"old".to_vec()) })
            .await
            .unwrap();
        cache.invalidate_movies().await;

        let after = cache
            .get_or_compute(key(), || async { Ok::<_, ()>(b"new".to_vec()) })
            .await
            .unwrap();
        assert_eq!(after.status, CacheStatus::Miss);
        assert_eq!(after.payload, b"new".to_vec());
        assert_eq!(
            metrics
                .cache_invalidations_total
                .with_label_values(&["movies", "ok"])
                .get(),
            1
        );
    }
}
