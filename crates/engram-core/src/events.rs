//! Typed Event Bus
//!
//! A small publish/subscribe surface fanning strongly typed events out of
//! the storage engine, the cache, and the vector index. Subscribers attach
//! through a broadcast channel; emitting with no subscribers is free.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default buffered capacity per subscriber
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Events published by the engine components
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum MemoryEvent {
    // Storage transitions
    EntryStored { id: String, namespace: String },
    EntryUpdated { id: String },
    EntryDeleted { id: String },
    BulkInserted { count: usize },
    BulkDeleted { count: usize },
    NamespaceCleared { namespace: String, count: usize },

    // Cache transitions
    CacheHit { key: String },
    CacheMiss { key: String },
    CacheSet { key: String },
    CacheDelete { key: String },
    CacheEvict { key: String },
    L1Hit { key: String },
    L2Hit { key: String },
    L2Write { key: String },

    // Vector index transitions
    PointAdded { id: String },
    PointRemoved { id: String },
    IndexRebuilt { count: usize, elapsed_ms: u64 },

    // Session lifecycle
    SessionStarted { session_id: String },
    SessionEnded { session_id: String },
}

/// Handle for publishing and subscribing to [`MemoryEvent`]s.
///
/// Cheap to clone; all clones share one channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MemoryEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        EventBus { tx }
    }

    /// Publish an event. Dropped silently when nobody is subscribed.
    pub fn emit(&self, event: MemoryEvent) {
        let _ = self.tx.send(event);
    }

    /// Attach a new subscriber receiving all events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<MemoryEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
