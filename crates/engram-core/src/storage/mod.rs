//! Storage Module
//!
//! Single-file SQLite storage layer with:
//! - FTS5 full-text search with query sanitization
//! - embedded vector index fed by entry embeddings
//! - versioned additive migrations
//! - composable query compiler (exact/prefix/keyword/semantic/hybrid)

mod migrations;
mod query;
mod sqlite;

pub use migrations::{apply_migrations, column_exists, get_current_version, Migration, MIGRATIONS};
pub use query::{
    sanitize_fts_query, MemoryQuery, QueryType, SearchOptions, SearchResult, DEFAULT_QUERY_LIMIT,
};
pub use sqlite::{
    ComponentHealth, HealthReport, MemoryStore, Result, StorageError, StoreStats,
};
