//! # Engram Core
//!
//! Embeddable, project-scoped memory engine for coding assistants:
//!
//! - **Storage engine**: single-file SQLite store with FTS5 keyword search,
//!   additive migrations, and a composable query compiler
//!   (exact/prefix/keyword/semantic/hybrid)
//! - **HNSW vector index**: approximate k-NN over entry embeddings with
//!   pluggable metrics and binary/scalar/product quantization
//! - **Cache tier**: LRU/TTL cache with byte budget, single-flight loader
//!   coalescing, and a two-tier write-through wrapper
//! - **Hook pipeline**: captures tool invocations into session-scoped
//!   observations, prompts, and structured summaries
//!
//! Embeddings arrive from an external [`embeddings::EmbeddingProvider`];
//! the engine never trains or hosts a model.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use engram_core::{MemoryConfig, MemoryService, EntryInput, MemoryQuery};
//!
//! let service = MemoryService::new(MemoryConfig::for_project("/path/to/project"));
//! service.initialize().await?;
//!
//! service.store_entry(EntryInput::new("patterns", "auth", "JWT + refresh")).await?;
//! let hits = service.query(&MemoryQuery::keyword("JWT").in_namespace("patterns")).await?;
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod cache;
pub mod config;
pub mod embeddings;
pub mod events;
pub mod hooks;
pub mod memory;
pub mod migrate;
pub mod service;
pub mod storage;
pub mod vector;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Record types
pub use memory::{
    AccessLevel, Entry, EntryInput, EntryPatch, MemoryType, Observation, ObservationKind,
    Session, SessionStatus, SessionSummary, UserPrompt, ValidationError,
};

// Configuration
pub use config::{FtsTokenizer, MemoryConfig, DEFAULT_DB_FILE};

// Events
pub use events::{EventBus, MemoryEvent};

// Cache tier
pub use cache::{CacheConfig, CacheError, CacheStats, CacheStore, InvalidationPattern, MemoryCache, TieredCache};

// Vector index
pub use vector::{DistanceMetric, HnswConfig, HnswIndex, Quantization, VectorIndexError, VectorIndexStats};

// Storage engine
pub use storage::{
    ComponentHealth, HealthReport, MemoryQuery, MemoryStore, QueryType, SearchOptions,
    SearchResult, StorageError, StoreStats,
};

// Hook pipeline
pub use hooks::{
    Enrichment, EnrichmentOracle, HookEnvelope, HookError, HookPipeline, HookResponse,
    NormalizedHookInput,
};

// Markdown import
pub use migrate::{import_markdown_dir, import_markdown_file, MigrateError, MigrationReport};

// Facade
pub use service::{MemoryService, ServiceError, ServiceStats};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Entry, EntryInput, EntryPatch, MemoryConfig, MemoryQuery, MemoryService, MemoryStore,
        MemoryType, QueryType, SearchOptions, ServiceError, StorageError,
    };

    pub use crate::{HookEnvelope, HookPipeline, HookResponse, NormalizedHookInput};

    pub use crate::{DistanceMetric, HnswConfig, HnswIndex, Quantization};

    pub use crate::{CacheConfig, MemoryCache, TieredCache};
}
