use std::sync::Arc;
use std::time::Duration;

use movies_cache::{
    CacheConsistencyCoordinator, CacheEntry, CacheStatus, CacheTag, InMemoryOutputCacheStore,
    OutputCacheStore, QuerySignature,
};

fn list_key(page: u32) -> movies_cache::CacheKey {
    QuerySignature::new("/api/movies")
        .param("page", page)
        .param("pageSize", 10)
        .into_key()
}

fn movies_entry(page: u32, ttl: Duration) -> CacheEntry {
    CacheEntry::new(
        list_key(page),
        format!("page {}", page).into_bytes(),
        vec![CacheTag::movies()],
        ttl,
    )
}

#[tokio::test]
async fn test_set_and_get() {
    let store = InMemoryOutputCacheStore::new();
    store
        .set(movies_entry(1, Duration::from_secs(60)))
        .await
        .unwrap();

    let entry = store.get(&list_key(1)).await.unwrap().unwrap();
    assert_eq!(entry.payload, b"page 1");
    assert!(entry.has_tag(&CacheTag::movies()));
}

#[tokio::test]
async fn test_get_nonexistent_returns_none() {
    let store = InMemoryOutputCacheStore::new();
    assert!(store.get(&list_key(9)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_remove_existing_key() {
    let store = InMemoryOutputCacheStore::new();
    store
        .set(movies_entry(1, Duration::from_secs(60)))
        .await
        .unwrap();

    assert!(store.remove(&list_key(1)).await.unwrap());
    assert!(!store.remove(&list_key(1)).await.unwrap());
    assert_eq!(store.tagged_count(&CacheTag::movies()).await, 0);
}

#[tokio::test]
async fn test_entry_expires_after_ttl() {
    let store = InMemoryOutputCacheStore::new();
    store
        .set(movies_entry(1, Duration::from_millis(50)))
        .await
        .unwrap();
    assert!(store.get(&list_key(1)).await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(store.get(&list_key(1)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_evict_by_tag_removes_only_tagged_entries() {
    let store = InMemoryOutputCacheStore::new();
    for page in 1..=3 {
        store
            .set(movies_entry(page, Duration::from_secs(60)))
            .await
            .unwrap();
    }
    let other_key = QuerySignature::new("/api/ratings/me").into_key();
    store
        .set(CacheEntry::new(
            other_key.clone(),
            b"ratings".to_vec(),
            vec![CacheTag::new("ratings")],
            Duration::from_secs(60),
        ))
        .await
        .unwrap();

    let removed = store.evict_by_tag(&CacheTag::movies()).await.unwrap();

    assert_eq!(removed, 3);
    for page in 1..=3 {
        assert!(store.get(&list_key(page)).await.unwrap().is_none());
    }
    assert!(store.get(&other_key).await.unwrap().is_some());
    assert_eq!(store.tagged_count(&CacheTag::movies()).await, 0);
}

#[tokio::test]
async fn test_evict_unknown_tag_is_noop() {
    let store = InMemoryOutputCacheStore::new();
    assert_eq!(store.evict_by_tag(&CacheTag::new("none")).await.unwrap(), 0);
}

#[tokio::test]
async fn test_invalidate_then_read_recomputes() {
    let coordinator = CacheConsistencyCoordinator::new(Arc::new(InMemoryOutputCacheStore::new()));
    let tags = [CacheTag::movies()];

    let first = coordinator
        .get_or_compute(list_key(1), &tags, || async { Ok::<_, ()>(b"v1".to_vec()) })
        .await
        .unwrap();
    assert_eq!(first.status, CacheStatus::Miss);

    coordinator.invalidate(&CacheTag::movies()).await.unwrap();

    let second = coordinator
        .get_or_compute(list_key(1), &tags, || async { Ok::<_, ()>(b"v2".to_vec()) })
        .await
        .unwrap();
    assert_eq!(second.status, CacheStatus::Miss);
    assert_eq!(second.payload, b"v2");
}

#[tokio::test]
async fn test_concurrent_readers_never_see_stale_after_invalidate() {
    let store = Arc::new(InMemoryOutputCacheStore::new());
    let coordinator = Arc::new(CacheConsistencyCoordinator::new(store.clone()));
    let version = Arc::new(std::sync::atomic::AtomicU64::new(1));

    let mut readers = Vec::new();
    for _ in 0..16 {
        let coordinator = coordinator.clone();
        let version = version.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..50 {
                let version = version.clone();
                coordinator
                    .get_or_compute(list_key(1), &[CacheTag::movies()], || async move {
                        let v = version.load(std::sync::atomic::Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok::<_, ()>(v.to_string().into_bytes())
                    })
                    .await
                    .unwrap();
            }
        }));
    }

    for v in 2..=20u64 {
        version.store(v, std::sync::atomic::Ordering::SeqCst);
        coordinator.invalidate(&CacheTag::movies()).await.unwrap();

        // 無効化の直後、キャッシュに残っていてよいのは新しい版の計算結果だけ
        if let Some(entry) = store.get(&list_key(1)).await.unwrap() {
            let cached: u64 = String::from_utf8_lossy(&entry.payload).parse().unwrap();
            assert!(cached >= v, "stale payload {} after invalidating at {}", cached, v);
        }
        tokio::task::yield_now().await;
    }

    for reader in readers {
        reader.await.unwrap();
    }
}
