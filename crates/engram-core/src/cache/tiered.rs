//! Tiered Cache
//!
//! An L1 [`MemoryCache`] over a collaborator pair: a loader consulted on
//! L1 misses and a writer invoked on every set (write-through). Deletes
//! and clears affect L1 only; the backing store stays authoritative.

use std::sync::Arc;

use async_trait::async_trait;

use super::lru::{CacheStats, MemoryCache, Result};
use crate::events::{EventBus, MemoryEvent};

/// Backing store consulted by [`TieredCache`].
#[async_trait]
pub trait CacheStore<T>: Send + Sync {
    /// Fetch a value by key; `None` when absent.
    async fn load(&self, key: &str) -> Result<Option<T>>;

    /// Persist a value (write-through target).
    async fn store(&self, key: &str, value: &T) -> Result<()>;
}

/// Two-tier cache: L1 memory cache plus a loader/writer collaborator.
pub struct TieredCache<T> {
    l1: MemoryCache<T>,
    backend: Arc<dyn CacheStore<T>>,
    events: std::sync::OnceLock<EventBus>,
}

impl<T> TieredCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(l1: MemoryCache<T>, backend: Arc<dyn CacheStore<T>>) -> Self {
        Self {
            l1,
            backend,
            events: std::sync::OnceLock::new(),
        }
    }

    /// Attach an event bus; only the first attachment wins.
    pub fn attach_events(&self, bus: EventBus) {
        let _ = self.events.set(bus);
    }

    fn emit(&self, event: MemoryEvent) {
        if let Some(bus) = self.events.get() {
            bus.emit(event);
        }
    }

    /// L1 first; on miss, consult the loader and promote any hit into L1.
    pub async fn get(&self, key: &str) -> Result<Option<T>> {
        if let Some(value) = self.l1.get(key) {
            self.emit(MemoryEvent::L1Hit {
                key: key.to_string(),
            });
            return Ok(Some(value));
        }

        match self.backend.load(key).await? {
            Some(value) => {
                self.l1.set(key, value.clone(), None);
                self.emit(MemoryEvent::L2Hit {
                    key: key.to_string(),
                });
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Write-through: store in L1 and invoke the writer.
    pub async fn set(&self, key: &str, value: T) -> Result<()> {
        self.l1.set(key, value.clone(), None);
        self.backend.store(key, &value).await?;
        self.emit(MemoryEvent::L2Write {
            key: key.to_string(),
        });
        Ok(())
    }

    /// Remove from L1 only.
    pub fn delete(&self, key: &str) -> bool {
        self.l1.delete(key)
    }

    /// Clear L1 only.
    pub fn clear(&self) {
        self.l1.clear();
    }

    /// L1 statistics.
    pub fn stats(&self) -> CacheStats {
        self.l1.stats()
    }

    /// Stop the L1 sweep task and drop L1 state.
    pub fn shutdown(&self) {
        self.l1.shutdown();
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::lru::{CacheConfig, CacheError};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MapStore {
        values: Mutex<HashMap<String, String>>,
        loads: Mutex<usize>,
    }

    impl MapStore {
        fn new() -> Self {
            Self {
                values: Mutex::new(HashMap::new()),
                loads: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl CacheStore<String> for MapStore {
        async fn load(&self, key: &str) -> Result<Option<String>> {
            *self.loads.lock().unwrap() += 1;
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        async fn store(&self, key: &str, value: &String) -> Result<()> {
            self.values
                .lock()
                .unwrap()
                .insert(key.to_string(), value.clone());
            Ok(())
        }
    }

    fn tiered() -> (TieredCache<String>, Arc<MapStore>) {
        let backend = Arc::new(MapStore::new());
        let cache = TieredCache::new(
            MemoryCache::new(CacheConfig::default()),
            Arc::clone(&backend) as Arc<dyn CacheStore<String>>,
        );
        (cache, backend)
    }

    #[tokio::test]
    async fn test_write_through_and_l1_hit() {
        let (cache, backend) = tiered();
        cache.set("k", "v".to_string()).await.unwrap();

        assert_eq!(backend.values.lock().unwrap().get("k").cloned(), Some("v".to_string()));
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
        // Served from L1, no loader call
        assert_eq!(*backend.loads.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_l2_hit_promotes_into_l1() {
        let (cache, backend) = tiered();
        backend
            .values
            .lock()
            .unwrap()
            .insert("cold".to_string(), "warm".to_string());

        assert_eq!(cache.get("cold").await.unwrap(), Some("warm".to_string()));
        assert_eq!(*backend.loads.lock().unwrap(), 1);

        // Promotion: second read stays in L1.
        assert_eq!(cache.get("cold").await.unwrap(), Some("warm".to_string()));
        assert_eq!(*backend.loads.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_affects_l1_only() {
        let (cache, backend) = tiered();
        cache.set("k", "v".to_string()).await.unwrap();
        assert!(cache.delete("k"));

        // Backend copy survives; next get re-promotes.
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(*backend.loads.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_tier_events() {
        let (cache, _backend) = tiered();
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        cache.attach_events(bus);

        cache.set("k", "v".to_string()).await.unwrap();
        cache.get("k").await.unwrap();

        let mut saw_write = false;
        let mut saw_l1 = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                MemoryEvent::L2Write { .. } => saw_write = true,
                MemoryEvent::L1Hit { .. } => saw_l1 = true,
                _ => {}
            }
        }
        assert!(saw_write);
        assert!(saw_l1);
    }

    struct FailingStore;

    #[async_trait]
    impl CacheStore<String> for FailingStore {
        async fn load(&self, _key: &str) -> Result<Option<String>> {
            Err(CacheError::Backend("unavailable".to_string()))
        }

        async fn store(&self, _key: &str, _value: &String) -> Result<()> {
            Err(CacheError::Backend("unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_backend_errors_propagate() {
        let cache = TieredCache::new(
            MemoryCache::new(CacheConfig::default()),
            Arc::new(FailingStore) as Arc<dyn CacheStore<String>>,
        );
        assert!(cache.get("k").await.is_err());
        assert!(cache.set("k", "v".to_string()).await.is_err());
    }
}
