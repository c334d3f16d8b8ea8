//! Memory Service Facade
//!
//! Single entry point owning the storage engine (which owns the vector
//! index), the entry cache, and the event bus. Threads the current session
//! through writes, exposes session start/checkpoint/end, and shuts the
//! components down in order: cache sweep stop, index drop, storage close.
//!
//! Every operation is async; dropping a returned future cancels the
//! operation at its next suspension point (storage I/O, index lock,
//! user-supplied loaders).

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::{RwLock, RwLockReadGuard};
use uuid::Uuid;

use crate::cache::{CacheError, CacheStats, MemoryCache};
use crate::config::MemoryConfig;
use crate::embeddings::EmbeddingProvider;
use crate::events::{EventBus, MemoryEvent};
use crate::memory::{Entry, EntryInput, EntryPatch, MemoryType, Session, SessionStatus};
use crate::storage::{
    ComponentHealth, HealthReport, MemoryQuery, MemoryStore, QueryType, SearchOptions,
    SearchResult, StorageError, StoreStats,
};
use crate::vector::VectorIndexStats;

/// Namespace holding session checkpoint entries
const CHECKPOINT_NAMESPACE: &str = "sessions";

// ============================================================================
// ERRORS
// ============================================================================

/// Facade error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Operation issued before `initialize()`
    #[error("memory service is not initialized")]
    NotInitialized,
    /// Checkpoint without a running session
    #[error("no active session")]
    NoActiveSession,
    /// Explicit lookup of an unknown record
    #[error("not found: {0}")]
    NotFound(String),
    /// Storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Cache failure
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Facade result type
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Aggregate statistics across the components
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    pub storage: StoreStats,
    pub cache: CacheStats,
    pub index: VectorIndexStats,
}

// ============================================================================
// SERVICE
// ============================================================================

struct ServiceInner {
    store: Arc<MemoryStore>,
    cache: MemoryCache<Entry>,
}

/// The facade. All methods take `&self`; share it behind an `Arc`.
pub struct MemoryService {
    config: MemoryConfig,
    events: EventBus,
    inner: RwLock<Option<ServiceInner>>,
    current_session: Mutex<Option<Session>>,
    embedder: std::sync::OnceLock<Arc<dyn EmbeddingProvider>>,
}

fn id_key(id: &str) -> String {
    format!("id:{id}")
}

fn pair_key(namespace: &str, key: &str) -> String {
    format!("key:{namespace}:{key}")
}

impl MemoryService {
    /// Build an uninitialized service. Every operation except
    /// `initialize()` fails with `NotInitialized` until it is called.
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            events: EventBus::new(),
            inner: RwLock::new(None),
            current_session: Mutex::new(None),
            embedder: std::sync::OnceLock::new(),
        }
    }

    /// Attach the external embedding provider. Entries stored without an
    /// embedding are embedded through it; a declining provider leaves
    /// them keyword-only. Only the first attachment wins.
    pub fn set_embedding_provider(&self, provider: Arc<dyn EmbeddingProvider>) {
        let _ = self.embedder.set(provider);
    }

    /// Open storage, start the cache sweep, and wire events. Idempotent;
    /// a second call returns success without reopening anything.
    pub async fn initialize(&self) -> Result<()> {
        let mut slot = self.inner.write().await;
        if slot.is_some() {
            return Ok(());
        }

        let store = Arc::new(MemoryStore::open(self.config.clone())?);
        store.attach_events(self.events.clone());

        let cache: MemoryCache<Entry> = MemoryCache::new(self.config.cache.clone());
        cache.attach_events(self.events.clone());
        cache.spawn_cleanup();

        *slot = Some(ServiceInner { store, cache });
        tracing::info!("memory service initialized");
        Ok(())
    }

    async fn inner(&self) -> Result<RwLockReadGuard<'_, ServiceInner>> {
        let guard = self.inner.read().await;
        RwLockReadGuard::try_map(guard, |slot| slot.as_ref())
            .map_err(|_| ServiceError::NotInitialized)
    }

    /// Handle for subscribing to component events.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn current_session_lock(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        match self.current_session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // ========================================================================
    // ENTRY OPERATIONS
    // ========================================================================

    /// Store an entry. When a session is active its id is threaded into
    /// the entry metadata; entries without an embedding consult the
    /// provider, when one is attached.
    pub async fn store_entry(&self, mut input: EntryInput) -> Result<Entry> {
        if input.embedding.is_none() {
            if let Some(provider) = self.embedder.get() {
                input.embedding = provider.embed(&input.content).await;
            }
        }

        if let Some(session) = self.current_session_lock().as_ref() {
            input
                .metadata
                .entry("sessionId".to_string())
                .or_insert_with(|| serde_json::Value::String(session.session_id.clone()));
        }

        let inner = self.inner().await?;
        let entry = inner.store.store(input)?;
        inner.cache.set(&id_key(&entry.id), entry.clone(), None);
        inner
            .cache
            .set(&pair_key(&entry.namespace, &entry.key), entry.clone(), None);
        Ok(entry)
    }

    /// Cached read by id. A cache hit still records the access against
    /// the canonical row.
    pub async fn get(&self, id: &str) -> Result<Option<Entry>> {
        let inner = self.inner().await?;
        if let Some(mut entry) = inner.cache.get(&id_key(id)) {
            if inner.store.record_access(id)? {
                entry.access_count += 1;
                entry.last_accessed_at = crate::memory::epoch_millis();
                return Ok(Some(entry));
            }
            // Stale cache for a deleted row.
            inner.cache.delete(&id_key(id));
            return Ok(None);
        }

        match inner.store.get(id)? {
            Some(entry) => {
                inner.cache.set(&id_key(id), entry.clone(), None);
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Cached read by the unique (namespace, key) pair.
    pub async fn get_by_key(&self, namespace: &str, key: &str) -> Result<Option<Entry>> {
        let inner = self.inner().await?;
        let cache_key = pair_key(namespace, key);
        if let Some(mut entry) = inner.cache.get(&cache_key) {
            if inner.store.record_access(&entry.id)? {
                entry.access_count += 1;
                entry.last_accessed_at = crate::memory::epoch_millis();
                return Ok(Some(entry));
            }
            inner.cache.delete(&cache_key);
            return Ok(None);
        }

        match inner.store.get_by_key(namespace, key)? {
            Some(entry) => {
                inner.cache.set(&cache_key, entry.clone(), None);
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Partial update; explicit `NotFound` for unknown ids.
    pub async fn update(&self, id: &str, patch: EntryPatch) -> Result<Entry> {
        let inner = self.inner().await?;
        let updated = inner
            .store
            .update(id, patch)?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
        inner.cache.set(&id_key(id), updated.clone(), None);
        inner.cache.set(
            &pair_key(&updated.namespace, &updated.key),
            updated.clone(),
            None,
        );
        Ok(updated)
    }

    /// Delete an entry, invalidating both cache keys.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let inner = self.inner().await?;
        let known = inner.store.peek(id)?;
        let removed = inner.store.delete(id)?;
        if removed {
            inner.cache.delete(&id_key(id));
            if let Some(entry) = known {
                inner.cache.delete(&pair_key(&entry.namespace, &entry.key));
            }
        }
        Ok(removed)
    }

    /// Return the existing entry for the pair, or build and store one.
    pub async fn get_or_create<F>(&self, namespace: &str, key: &str, factory: F) -> Result<Entry>
    where
        F: FnOnce() -> EntryInput,
    {
        if let Some(existing) = self.get_by_key(namespace, key).await? {
            return Ok(existing);
        }
        let mut input = factory();
        input.namespace = namespace.to_string();
        input.key = key.to_string();
        self.store_entry(input).await
    }

    pub async fn query(&self, query: &MemoryQuery) -> Result<Vec<Entry>> {
        let inner = self.inner().await?;
        Ok(inner.store.query(query)?)
    }

    pub async fn search(
        &self,
        query_vector: &[f32],
        opts: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let inner = self.inner().await?;
        Ok(inner.store.search(query_vector, opts)?)
    }

    // ========================================================================
    // BULK AND NAMESPACE OPERATIONS
    // ========================================================================

    pub async fn bulk_insert(&self, inputs: Vec<EntryInput>) -> Result<Vec<Entry>> {
        let inner = self.inner().await?;
        let stored = inner.store.bulk_insert(inputs)?;
        for entry in &stored {
            inner.cache.set(&id_key(&entry.id), entry.clone(), None);
        }
        Ok(stored)
    }

    pub async fn bulk_delete(&self, ids: &[String]) -> Result<usize> {
        let inner = self.inner().await?;
        let removed = inner.store.bulk_delete(ids)?;
        for id in ids {
            inner.cache.delete(&id_key(id));
        }
        Ok(removed)
    }

    pub async fn list_namespaces(&self) -> Result<Vec<String>> {
        let inner = self.inner().await?;
        Ok(inner.store.list_namespaces()?)
    }

    pub async fn count(&self, namespace: Option<&str>) -> Result<i64> {
        let inner = self.inner().await?;
        Ok(inner.store.count(namespace)?)
    }

    pub async fn clear_namespace(&self, namespace: &str) -> Result<usize> {
        let inner = self.inner().await?;
        let removed = inner.store.clear_namespace(namespace)?;
        // Entry ids are gone; drop the whole cache rather than guess keys.
        inner.cache.clear();
        Ok(removed)
    }

    // ========================================================================
    // SESSIONS
    // ========================================================================

    /// Begin a session and make it current.
    pub async fn start_session(&self, project: &str, prompt: Option<&str>) -> Result<Session> {
        let inner = self.inner().await?;
        let session_id = format!("session-{}", Uuid::new_v4());
        let session = inner.store.ensure_session(&session_id, project, prompt)?;
        *self.current_session_lock() = Some(session.clone());
        self.events.emit(MemoryEvent::SessionStarted {
            session_id: session.session_id.clone(),
        });
        Ok(session)
    }

    pub fn get_current_session(&self) -> Option<Session> {
        self.current_session_lock().clone()
    }

    /// Persist a labeled checkpoint entry for the current session.
    /// Fails with `NoActiveSession` when none is running.
    pub async fn checkpoint(&self, label: &str) -> Result<Entry> {
        let session = self
            .get_current_session()
            .ok_or(ServiceError::NoActiveSession)?;

        let existing = self
            .query(
                &MemoryQuery {
                    query_type: QueryType::Prefix,
                    key_prefix: Some(format!("{}/checkpoint-", session.session_id)),
                    namespace: Some(CHECKPOINT_NAMESPACE.to_string()),
                    limit: 1000,
                    ..Default::default()
                },
            )
            .await?;
        let number = existing.len() + 1;

        let mut input = EntryInput::new(
            CHECKPOINT_NAMESPACE,
            format!("{}/checkpoint-{number}", session.session_id),
            label.to_string(),
        );
        input.memory_type = MemoryType::Episodic;
        input.metadata.insert(
            "checkpoint".to_string(),
            serde_json::Value::from(number as i64),
        );
        self.store_entry(input).await
    }

    /// End the current session, storing the given summary text (or the
    /// session's accumulated one-liner). Returns the closed session.
    pub async fn end_session(&self, summary: Option<&str>) -> Result<Option<Session>> {
        let Some(session) = self.current_session_lock().take() else {
            return Ok(None);
        };

        let inner = self.inner().await?;
        let summary = summary
            .map(str::to_string)
            .or_else(|| session.summary.clone());
        inner.store.finish_session(
            &session.session_id,
            summary.as_deref(),
            SessionStatus::Completed,
        )?;
        self.events.emit(MemoryEvent::SessionEnded {
            session_id: session.session_id.clone(),
        });
        Ok(inner.store.get_session(&session.session_id)?)
    }

    pub async fn get_recent_sessions(
        &self,
        project: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Session>> {
        let inner = self.inner().await?;
        Ok(inner.store.recent_sessions(project, limit)?)
    }

    // ========================================================================
    // STATS, HEALTH, SHUTDOWN
    // ========================================================================

    pub async fn get_stats(&self) -> Result<ServiceStats> {
        let inner = self.inner().await?;
        Ok(ServiceStats {
            storage: inner.store.get_stats()?,
            cache: inner.cache.stats(),
            index: inner.store.index_stats(),
        })
    }

    pub async fn health_check(&self) -> Result<HealthReport> {
        let inner = self.inner().await?;
        let mut report = inner.store.health_check();
        let cache_stats = inner.cache.stats();
        report.components.push(ComponentHealth {
            name: "cache".to_string(),
            healthy: true,
            detail: format!(
                "{} entries, {:.0}% hit rate",
                cache_stats.size,
                cache_stats.hit_rate * 100.0
            ),
        });
        Ok(report)
    }

    /// Shared handle to the storage engine (hook pipeline, tools).
    pub async fn store(&self) -> Result<Arc<MemoryStore>> {
        let inner = self.inner().await?;
        Ok(Arc::clone(&inner.store))
    }

    /// Ordered shutdown: stop the cache sweep, then drop the index with
    /// its storage engine after a final optimize pass. The service returns
    /// `NotInitialized` afterwards.
    pub async fn shutdown(&self) -> Result<()> {
        let Some(inner) = self.inner.write().await.take() else {
            return Ok(());
        };
        inner.cache.shutdown();
        if let Err(e) = inner.store.optimize() {
            tracing::warn!(error = %e, "optimize on shutdown failed");
        }
        drop(inner.store);
        *self.current_session_lock() = None;
        tracing::info!("memory service shut down");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn service() -> (MemoryService, TempDir) {
        let dir = TempDir::new().unwrap();
        let service = MemoryService::new(MemoryConfig::for_project(dir.path()));
        service.initialize().await.unwrap();
        (service, dir)
    }

    #[tokio::test]
    async fn test_operations_before_initialize_fail() {
        let dir = TempDir::new().unwrap();
        let service = MemoryService::new(MemoryConfig::for_project(dir.path()));
        let err = service.get("x").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotInitialized));
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let (service, _dir) = service().await;
        service.initialize().await.unwrap();
        service
            .store_entry(EntryInput::new("ns", "k", "c"))
            .await
            .unwrap();
        assert_eq!(service.count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cached_get_still_counts_accesses() {
        let (service, _dir) = service().await;
        let entry = service
            .store_entry(EntryInput::new("ns", "k", "c"))
            .await
            .unwrap();

        let first = service.get(&entry.id).await.unwrap().unwrap();
        let second = service.get(&entry.id).await.unwrap().unwrap();
        assert!(second.access_count > first.access_count - 1);

        // The canonical row saw both reads.
        let store = service.store().await.unwrap();
        let row = store.peek(&entry.id).unwrap().unwrap();
        assert_eq!(row.access_count, 2);
    }

    #[tokio::test]
    async fn test_update_and_not_found() {
        let (service, _dir) = service().await;
        let entry = service
            .store_entry(EntryInput::new("ns", "k", "v1"))
            .await
            .unwrap();

        let updated = service
            .update(
                &entry.id,
                EntryPatch {
                    content: Some("v2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.version, 2);

        // Cache reflects the update.
        let read = service.get(&entry.id).await.unwrap().unwrap();
        assert_eq!(read.content, "v2");

        let err = service.update("missing", EntryPatch::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_invalidates_cache() {
        let (service, _dir) = service().await;
        let entry = service
            .store_entry(EntryInput::new("ns", "k", "c"))
            .await
            .unwrap();
        service.get(&entry.id).await.unwrap();

        assert!(service.delete(&entry.id).await.unwrap());
        assert!(service.get(&entry.id).await.unwrap().is_none());
        assert!(service.get_by_key("ns", "k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_or_create() {
        let (service, _dir) = service().await;
        let created = service
            .get_or_create("ns", "k", || EntryInput::new("ignored", "ignored", "fresh"))
            .await
            .unwrap();
        assert_eq!(created.namespace, "ns");
        assert_eq!(created.key, "k");

        let again = service
            .get_or_create("ns", "k", || EntryInput::new("ns", "k", "other"))
            .await
            .unwrap();
        assert_eq!(again.id, created.id);
        assert_eq!(again.content, "fresh");
    }

    #[tokio::test]
    async fn test_session_lifecycle_and_checkpoint() {
        let (service, _dir) = service().await;

        let err = service.checkpoint("too early").await.unwrap_err();
        assert!(matches!(err, ServiceError::NoActiveSession));

        let session = service
            .start_session("widgets", Some("build the thing"))
            .await
            .unwrap();
        assert_eq!(service.get_current_session().unwrap().id, session.id);

        let first = service.checkpoint("halfway").await.unwrap();
        assert!(first.key.ends_with("/checkpoint-1"));
        let second = service.checkpoint("almost done").await.unwrap();
        assert!(second.key.ends_with("/checkpoint-2"));

        let closed = service.end_session(Some("shipped it")).await.unwrap().unwrap();
        assert_eq!(closed.status, SessionStatus::Completed);
        assert_eq!(closed.summary.as_deref(), Some("shipped it"));
        assert!(service.get_current_session().is_none());

        // Checkpoint after end fails again.
        let err = service.checkpoint("late").await.unwrap_err();
        assert!(matches!(err, ServiceError::NoActiveSession));
    }

    #[tokio::test]
    async fn test_session_id_threaded_into_writes() {
        let (service, _dir) = service().await;
        let session = service.start_session("widgets", None).await.unwrap();

        let entry = service
            .store_entry(EntryInput::new("ns", "k", "c"))
            .await
            .unwrap();
        assert_eq!(
            entry.metadata.get("sessionId"),
            Some(&serde_json::Value::String(session.session_id))
        );
    }

    struct AxisEmbedder;

    #[async_trait::async_trait]
    impl crate::embeddings::EmbeddingProvider for AxisEmbedder {
        async fn embed(&self, text: &str) -> Option<Vec<f32>> {
            if text.contains("skip") {
                return None;
            }
            let mut v = vec![0.0f32; 4];
            v[text.len() % 4] = 1.0;
            Some(v)
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    #[tokio::test]
    async fn test_embedding_provider_fills_missing_vectors() {
        let dir = TempDir::new().unwrap();
        let mut config = MemoryConfig::for_project(dir.path());
        config.index.dimensions = 4;
        let service = MemoryService::new(config);
        service.initialize().await.unwrap();
        service.set_embedding_provider(Arc::new(AxisEmbedder));

        let embedded = service
            .store_entry(EntryInput::new("ns", "a", "embed me"))
            .await
            .unwrap();
        assert!(embedded.embedding.is_some());

        // A declining provider leaves the entry keyword-only.
        let declined = service
            .store_entry(EntryInput::new("ns", "b", "skip this one"))
            .await
            .unwrap();
        assert!(declined.embedding.is_none());

        // Caller-supplied vectors are never overwritten.
        let mut explicit = EntryInput::new("ns", "c", "has a vector");
        explicit.embedding = Some(vec![0.0, 0.0, 1.0, 0.0]);
        let explicit = service.store_entry(explicit).await.unwrap();
        assert_eq!(explicit.embedding, Some(vec![0.0, 0.0, 1.0, 0.0]));
    }

    #[tokio::test]
    async fn test_stats_and_health() {
        let (service, _dir) = service().await;
        service
            .store_entry(EntryInput::new("ns", "k", "c"))
            .await
            .unwrap();

        let stats = service.get_stats().await.unwrap();
        assert_eq!(stats.storage.total_entries, 1);

        let health = service.health_check().await.unwrap();
        assert!(health.healthy);
        assert!(health.components.iter().any(|c| c.name == "cache"));
    }

    #[tokio::test]
    async fn test_shutdown_then_not_initialized() {
        let (service, _dir) = service().await;
        service
            .store_entry(EntryInput::new("ns", "k", "c"))
            .await
            .unwrap();
        service.shutdown().await.unwrap();

        let err = service.get("x").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotInitialized));

        // Reinitialize finds the same data.
        service.initialize().await.unwrap();
        assert_eq!(service.count(None).await.unwrap(), 1);
    }
}
