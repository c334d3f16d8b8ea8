//! Single-Tier LRU/TTL Cache
//!
//! A keyed value cache with:
//! - LRU ordering maintained on both hits and writes
//! - default and per-entry TTL, expired entries removed lazily
//! - optional byte budget computed by a pluggable sizer
//! - single-flight loader coalescing for `get_or_set`
//! - a background expiry sweep with an explicit shutdown handle

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::events::{EventBus, MemoryEvent};

// ============================================================================
// ERRORS
// ============================================================================

/// Cache error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A user-supplied loader failed
    #[error("cache loader failed: {0}")]
    Loader(String),
    /// The tiered backend failed
    #[error("cache backend failed: {0}")]
    Backend(String),
}

/// Cache result type
pub type Result<T> = std::result::Result<T, CacheError>;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for [`MemoryCache`]
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub max_size: usize,
    /// Optional byte budget over all cached values
    pub max_memory: Option<usize>,
    /// Default time-to-live; per-entry TTLs override this
    pub default_ttl: Option<Duration>,
    /// Interval of the background expiry sweep
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            max_memory: None,
            default_ttl: None,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

/// Point-in-time statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub memory_usage: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// hits / (hits + misses); 0 when nothing was looked up yet
    pub hit_rate: f64,
}

/// Pattern accepted by [`MemoryCache::invalidate_pattern`].
///
/// Plain strings match as a substring of the key; anchored matching
/// requires a regex.
#[derive(Debug, Clone)]
pub enum InvalidationPattern {
    Substring(String),
    Regex(regex::Regex),
}

impl InvalidationPattern {
    fn matches(&self, key: &str) -> bool {
        match self {
            InvalidationPattern::Substring(s) => key.contains(s.as_str()),
            InvalidationPattern::Regex(re) => re.is_match(key),
        }
    }
}

impl From<&str> for InvalidationPattern {
    fn from(s: &str) -> Self {
        InvalidationPattern::Substring(s.to_string())
    }
}

impl From<String> for InvalidationPattern {
    fn from(s: String) -> Self {
        InvalidationPattern::Substring(s)
    }
}

impl From<regex::Regex> for InvalidationPattern {
    fn from(re: regex::Regex) -> Self {
        InvalidationPattern::Regex(re)
    }
}

// ============================================================================
// INTERNALS
// ============================================================================

type Sizer<T> = Arc<dyn Fn(&T) -> usize + Send + Sync>;

struct Slot<T> {
    value: T,
    size: usize,
    expires_at: Option<Instant>,
    tick: u64,
}

struct CacheState<T> {
    map: HashMap<String, Slot<T>>,
    /// Recency index: oldest tick first. One entry per cached key.
    recency: BTreeMap<u64, String>,
    tick: u64,
    memory_usage: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<T> CacheState<T> {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            recency: BTreeMap::new(),
            tick: 0,
            memory_usage: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Move a key to the most-recently-used position.
    fn touch(&mut self, key: &str) {
        let tick = self.next_tick();
        if let Some(slot) = self.map.get_mut(key) {
            self.recency.remove(&slot.tick);
            slot.tick = tick;
            self.recency.insert(tick, key.to_string());
        }
    }

    /// Remove a key outright. Returns the removed slot.
    fn remove(&mut self, key: &str) -> Option<Slot<T>> {
        let slot = self.map.remove(key)?;
        self.recency.remove(&slot.tick);
        self.memory_usage = self.memory_usage.saturating_sub(slot.size);
        Some(slot)
    }

    /// Key at the LRU tail (oldest).
    fn oldest_key(&self) -> Option<String> {
        self.recency.values().next().cloned()
    }

    fn over_budget(&self, max_size: usize, max_memory: Option<usize>) -> bool {
        if self.map.len() > max_size {
            return true;
        }
        match max_memory {
            Some(budget) => self.memory_usage > budget,
            None => false,
        }
    }
}

fn expired<T>(slot: &Slot<T>, now: Instant) -> bool {
    slot.expires_at.is_some_and(|at| at <= now)
}

struct CacheShared<T> {
    state: Mutex<CacheState<T>>,
    config: CacheConfig,
    sizer: Sizer<T>,
    events: OnceLock<EventBus>,
    /// Per-key in-flight loader locks for single-flight coalescing
    flights: tokio::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

// ============================================================================
// MEMORY CACHE
// ============================================================================

/// Single-tier LRU/TTL cache.
///
/// Cheap to clone; all clones share one store.
pub struct MemoryCache<T> {
    shared: Arc<CacheShared<T>>,
}

impl<T> Clone for MemoryCache<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> MemoryCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cache with a JSON-length sizer.
    pub fn new(config: CacheConfig) -> Self
    where
        T: Serialize,
    {
        Self::with_sizer(
            config,
            Arc::new(|value: &T| {
                serde_json::to_vec(value)
                    .map(|b| b.len())
                    .unwrap_or(std::mem::size_of::<T>())
            }),
        )
    }

    /// Create a cache with a caller-supplied byte sizer.
    pub fn with_sizer(config: CacheConfig, sizer: Sizer<T>) -> Self {
        Self {
            shared: Arc::new(CacheShared {
                state: Mutex::new(CacheState::new()),
                config,
                sizer,
                events: OnceLock::new(),
                flights: tokio::sync::Mutex::new(HashMap::new()),
                sweeper: Mutex::new(None),
            }),
        }
    }

    /// Attach an event bus; only the first attachment wins.
    pub fn attach_events(&self, bus: EventBus) {
        let _ = self.shared.events.set(bus);
    }

    fn emit(&self, event: MemoryEvent) {
        if let Some(bus) = self.shared.events.get() {
            bus.emit(event);
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CacheState<T>> {
        // A poisoned lock only happens if a sizer panicked; the state is
        // still structurally sound, so keep serving.
        match self.shared.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Look a key up, refreshing its LRU position on a hit.
    ///
    /// Expired entries are treated as absent and removed.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        let mut state = self.lock_state();

        let is_expired = match state.map.get(key) {
            Some(slot) => expired(slot, now),
            None => {
                state.misses += 1;
                drop(state);
                self.emit(MemoryEvent::CacheMiss {
                    key: key.to_string(),
                });
                return None;
            }
        };

        if is_expired {
            state.remove(key);
            state.misses += 1;
            drop(state);
            self.emit(MemoryEvent::CacheMiss {
                key: key.to_string(),
            });
            return None;
        }

        state.touch(key);
        state.hits += 1;
        let value = state.map.get(key).map(|slot| slot.value.clone());
        drop(state);
        self.emit(MemoryEvent::CacheHit {
            key: key.to_string(),
        });
        value
    }

    /// Insert or replace a value. Replacement does not count as eviction;
    /// budget overruns evict from the LRU tail.
    pub fn set(&self, key: &str, value: T, ttl: Option<Duration>) {
        self.insert(key, value, ttl, true);
        self.emit(MemoryEvent::CacheSet {
            key: key.to_string(),
        });
    }

    fn insert(&self, key: &str, value: T, ttl: Option<Duration>, count_evictions: bool) {
        let size = (self.shared.sizer)(&value);
        let expires_at = ttl
            .or(self.shared.config.default_ttl)
            .map(|d| Instant::now() + d);

        let mut evicted = Vec::new();
        {
            let mut state = self.lock_state();
            state.remove(key);
            let tick = state.next_tick();
            state.map.insert(
                key.to_string(),
                Slot {
                    value,
                    size,
                    expires_at,
                    tick,
                },
            );
            state.recency.insert(tick, key.to_string());
            state.memory_usage += size;

            while state.over_budget(self.shared.config.max_size, self.shared.config.max_memory) {
                let Some(victim) = state.oldest_key() else {
                    break;
                };
                if victim == key {
                    // Never evict the value just written.
                    break;
                }
                state.remove(&victim);
                if count_evictions {
                    state.evictions += 1;
                }
                evicted.push(victim);
            }
        }

        for victim in evicted {
            self.emit(MemoryEvent::CacheEvict { key: victim });
        }
    }

    /// Remove a key. Returns whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.lock_state().remove(key).is_some();
        if removed {
            self.emit(MemoryEvent::CacheDelete {
                key: key.to_string(),
            });
        }
        removed
    }

    /// Drop all entries. Statistics are preserved.
    pub fn clear(&self) {
        let mut state = self.lock_state();
        state.map.clear();
        state.recency.clear();
        state.memory_usage = 0;
    }

    /// TTL-respecting presence check; does not refresh LRU position.
    pub fn has(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut state = self.lock_state();
        match state.map.get(key) {
            Some(slot) if expired(slot, now) => {
                state.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Return the cached value, or load and cache it.
    ///
    /// Concurrent callers for the same absent key share one loader
    /// invocation; the rest observe the cached result.
    pub async fn get_or_set<F, Fut>(&self, key: &str, loader: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let flight = {
            let mut flights = self.shared.flights.lock().await;
            Arc::clone(
                flights
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        let _guard = flight.lock().await;

        // A concurrent flight may have populated the key while we waited.
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let result = loader().await;
        if let Ok(ref value) = result {
            self.set(key, value.clone(), None);
        }

        self.shared.flights.lock().await.remove(key);
        result
    }

    /// Load the missing subset of `keys` with one batch call and cache
    /// each returned pair. Returns the number of values cached.
    pub async fn prefetch<F, Fut>(&self, keys: &[String], batch_loader: F) -> Result<usize>
    where
        F: FnOnce(Vec<String>) -> Fut,
        Fut: std::future::Future<Output = Result<Vec<(String, T)>>>,
    {
        let missing: Vec<String> = keys
            .iter()
            .filter(|k| !self.has(k))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(0);
        }

        let loaded = batch_loader(missing).await?;
        let count = loaded.len();
        for (key, value) in loaded {
            self.set(&key, value, None);
        }
        Ok(count)
    }

    /// Bulk seed. Stops at the budget instead of evicting; seeds inserted
    /// below budget never charge the eviction counter.
    pub fn warm_up(&self, seed: Vec<(String, T)>) -> usize {
        let mut inserted = 0;
        for (key, value) in seed {
            {
                let state = self.lock_state();
                let at_capacity = state.map.len() >= self.shared.config.max_size
                    || self
                        .shared
                        .config
                        .max_memory
                        .is_some_and(|budget| state.memory_usage >= budget);
                if at_capacity && !state.map.contains_key(&key) {
                    break;
                }
            }
            self.insert(&key, value, None, false);
            inserted += 1;
        }
        inserted
    }

    /// Remove every key matching the pattern. Returns the count removed.
    pub fn invalidate_pattern(&self, pattern: impl Into<InvalidationPattern>) -> usize {
        let pattern = pattern.into();
        let victims: Vec<String> = {
            let state = self.lock_state();
            state
                .map
                .keys()
                .filter(|k| pattern.matches(k))
                .cloned()
                .collect()
        };
        let mut removed = 0;
        for key in victims {
            if self.delete(&key) {
                removed += 1;
            }
        }
        removed
    }

    /// Point-in-time statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.lock_state();
        let lookups = state.hits + state.misses;
        CacheStats {
            size: state.map.len(),
            memory_usage: state.memory_usage,
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                state.hits as f64 / lookups as f64
            },
        }
    }

    /// Drop expired entries eagerly. Returns the count removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let victims: Vec<String> = {
            let state = self.lock_state();
            state
                .map
                .iter()
                .filter(|(_, slot)| expired(slot, now))
                .map(|(k, _)| k.clone())
                .collect()
        };
        let mut removed = 0;
        {
            let mut state = self.lock_state();
            for key in &victims {
                if state.remove(key).is_some() {
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Spawn the periodic expiry sweep. Idempotent.
    pub fn spawn_cleanup(&self) {
        let mut sweeper = match self.shared.sweeper.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if sweeper.is_some() {
            return;
        }
        let cache = self.clone();
        let interval = self.shared.config.cleanup_interval;
        *sweeper = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = cache.sweep_expired();
                if removed > 0 {
                    tracing::debug!(removed, "cache expiry sweep");
                }
            }
        }));
    }

    /// Stop the background sweep and drop all state.
    pub fn shutdown(&self) {
        let handle = {
            let mut sweeper = match self.shared.sweeper.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            sweeper.take()
        };
        if let Some(handle) = handle {
            handle.abort();
        }
        self.clear();
    }
}

// ============================================================================
// TESTS
// ============================================================================
