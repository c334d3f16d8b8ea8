//! Journey: LRU eviction order and stats, through the raw cache type.

use engram_core::{CacheConfig, MemoryCache};

#[tokio::test]
async fn lru_keeps_refreshed_keys() {
    let cache: MemoryCache<String> = MemoryCache::new(CacheConfig {
        max_size: 3,
        ..Default::default()
    });
    cache.set("k1", "v1".to_string(), None);
    cache.set("k2", "v2".to_string(), None);
    cache.set("k3", "v3".to_string(), None);

    // Refresh k1, then push the cache over capacity.
    assert!(cache.get("k1").is_some());
    cache.set("k4", "v4".to_string(), None);

    assert!(cache.get("k2").is_none());
    assert!(cache.get("k1").is_some());
    assert_eq!(cache.stats().evictions, 1);
}

#[tokio::test]
async fn facade_reads_hit_the_cache() {
    use engram_e2e_tests::harness::TestMemory;
    use engram_core::EntryInput;

    let memory = TestMemory::new().await;
    let service = &memory.service;
    let entry = service
        .store_entry(EntryInput::new("ns", "hot", "cached content"))
        .await
        .unwrap();

    for _ in 0..5 {
        assert!(service.get(&entry.id).await.unwrap().is_some());
    }

    let stats = service.get_stats().await.unwrap();
    assert!(stats.cache.hits >= 5);
}
