//! SQLite Storage Engine
//!
//! Single-file relational store for entries, sessions, prompts,
//! observations, and summaries, with a parallel FTS5 table and an embedded
//! HNSW index fed by entry embeddings.
//!
//! Uses separate reader/writer connections for interior mutability. All
//! methods take `&self`, making the store `Send + Sync` so callers can
//! share an `Arc<MemoryStore>`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock};

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use serde::Serialize;
use uuid::Uuid;

use super::migrations;
use super::query::{
    sanitize_fts_query, MemoryQuery, QueryType, SearchOptions, SearchResult,
};
use crate::config::MemoryConfig;
use crate::embeddings::{vector_from_bytes, vector_to_bytes};
use crate::events::{EventBus, MemoryEvent};
use crate::memory::{
    epoch_millis, Entry, EntryInput, EntryPatch, MemoryType, Observation, ObservationKind,
    Session, SessionStatus, SessionSummary, UserPrompt, ValidationError,
};
use crate::vector::{HnswIndex, VectorIndexError, VectorIndexStats};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Record-level invariant violation
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// (namespace, key) already bound to a different id
    #[error("conflict: ('{namespace}', '{key}') is bound to a different id")]
    Conflict { namespace: String, key: String },
    /// Explicit lookup of an unknown record
    #[error("not found: {0}")]
    NotFound(String),
    /// Vector index rejected an operation
    #[error(transparent)]
    Index(#[from] VectorIndexError),
    /// Semantic queries need a query vector
    #[error("semantic queries require a query embedding")]
    MissingQueryEmbedding,
    /// Internal storage failure
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// STATS AND HEALTH
// ============================================================================

/// Aggregate storage statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_entries: i64,
    pub entries_by_namespace: HashMap<String, i64>,
    pub entries_by_type: HashMap<String, i64>,
    /// Database footprint in bytes (page_count * page_size)
    pub memory_usage: i64,
}

/// One component's health
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub name: String,
    pub healthy: bool,
    pub detail: String,
}

/// Aggregate health report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub healthy: bool,
    pub components: Vec<ComponentHealth>,
}

// ============================================================================
// STORE
// ============================================================================

/// The storage engine.
pub struct MemoryStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    index: HnswIndex,
    config: MemoryConfig,
    db_path: PathBuf,
    events: OnceLock<EventBus>,
}

impl MemoryStore {
    /// Apply PRAGMAs to a connection.
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -32000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Open (and initialize) the store. Idempotent: re-opening an existing
    /// database re-runs only the pending migrations.
    pub fn open(config: MemoryConfig) -> Result<Self> {
        let db_path = config.db_path()?;

        let writer_conn = Connection::open(&db_path)?;
        Self::configure_connection(&writer_conn)?;
        migrations::apply_migrations(&writer_conn)?;
        Self::ensure_fts_table(&writer_conn, &config)?;

        let reader_conn = Connection::open(&db_path)?;
        Self::configure_connection(&reader_conn)?;

        let store = Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            index: HnswIndex::new(config.index.clone()),
            config,
            db_path,
            events: OnceLock::new(),
        };
        store.load_embeddings_into_index()?;

        tracing::info!(path = %store.db_path.display(), "memory store opened");
        Ok(store)
    }

    fn ensure_fts_table(conn: &Connection, config: &MemoryConfig) -> Result<()> {
        let tokenize = config.tokenizer.as_sql().replace('\'', "''");
        conn.execute_batch(&format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS memory_fts USING fts5(
                entry_id UNINDEXED,
                content,
                entry_key,
                tags,
                tokenize='{tokenize}'
            );"
        ))?;
        Ok(())
    }

    /// Load stored embeddings into the vector index.
    fn load_embeddings_into_index(&self) -> Result<()> {
        let reader = self.reader()?;
        let mut stmt = reader
            .prepare("SELECT id, embedding FROM memory_entries WHERE embedding IS NOT NULL")?;
        let rows: Vec<(String, Vec<u8>)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();
        drop(stmt);
        drop(reader);

        for (id, blob) in rows {
            let Some(vector) = vector_from_bytes(&blob) else {
                tracing::warn!(%id, "skipping malformed embedding blob");
                continue;
            };
            if let Err(e) = self.index.add_point(&id, &vector) {
                tracing::warn!(%id, error = %e, "failed to index stored embedding");
            }
        }
        Ok(())
    }

    /// Attach an event bus to the store and its vector index.
    pub fn attach_events(&self, bus: EventBus) {
        self.index.attach_events(bus.clone());
        let _ = self.events.set(bus);
    }

    fn emit(&self, event: MemoryEvent) {
        if let Some(bus) = self.events.get() {
            bus.emit(event);
        }
    }

    fn writer(&self) -> Result<MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| StorageError::Internal("writer lock poisoned".into()))
    }

    fn reader(&self) -> Result<MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| StorageError::Internal("reader lock poisoned".into()))
    }

    /// Path of the backing database file.
    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Short name of the FTS tokenizer in use.
    pub fn active_tokenizer(&self) -> &str {
        self.config.tokenizer.name()
    }

    /// Whether the tokenizer handles CJK text without word breaks.
    pub fn is_cjk_optimized(&self) -> bool {
        self.config.tokenizer.is_cjk_optimized()
    }

    // ========================================================================
    // ROW MAPPING
    // ========================================================================

    fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<Entry> {
        let tags: String = row.get("tags")?;
        let metadata: String = row.get("metadata")?;
        let refs: String = row.get("refs")?;
        let memory_type: String = row.get("memory_type")?;
        let access_level: String = row.get("access_level")?;
        let embedding: Option<Vec<u8>> = row.get("embedding")?;

        Ok(Entry {
            id: row.get("id")?,
            key: row.get("key")?,
            content: row.get("content")?,
            memory_type: MemoryType::parse_name(&memory_type),
            namespace: row.get("namespace")?,
            tags: serde_json::from_str(&tags).unwrap_or_default(),
            metadata: serde_json::from_str(&metadata).unwrap_or_default(),
            embedding: embedding.as_deref().and_then(vector_from_bytes),
            access_level: access_level.as_str().into(),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            last_accessed_at: row.get("last_accessed_at")?,
            version: row.get("version")?,
            access_count: row.get("access_count")?,
            references: serde_json::from_str(&refs).unwrap_or_default(),
        })
    }

    fn json_text<T: Serialize>(value: &T) -> String {
        serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
    }

    /// Fetch without touching access bookkeeping.
    fn fetch_entry(&self, id: &str) -> Result<Option<Entry>> {
        let reader = self.reader()?;
        let entry = reader
            .query_row(
                "SELECT * FROM memory_entries WHERE id = ?1",
                params![id],
                Self::row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    fn fetch_entry_by_key(&self, namespace: &str, key: &str) -> Result<Option<Entry>> {
        let reader = self.reader()?;
        let entry = reader
            .query_row(
                "SELECT * FROM memory_entries WHERE namespace = ?1 AND key = ?2",
                params![namespace, key],
                Self::row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    /// Record a read: access_count + 1, last_accessed_at = now.
    fn touch(&self, entry: &mut Entry) -> Result<()> {
        let now = epoch_millis();
        let writer = self.writer()?;
        writer.execute(
            "UPDATE memory_entries
             SET access_count = access_count + 1, last_accessed_at = ?1
             WHERE id = ?2",
            params![now, entry.id],
        )?;
        entry.access_count += 1;
        entry.last_accessed_at = now;
        Ok(())
    }

    fn write_fts_row(tx: &rusqlite::Transaction<'_>, entry_id: &str) -> rusqlite::Result<()> {
        tx.execute(
            "DELETE FROM memory_fts WHERE entry_id = ?1",
            params![entry_id],
        )?;
        let (content, key, tags): (String, String, String) = tx.query_row(
            "SELECT content, key, tags FROM memory_entries WHERE id = ?1",
            params![entry_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        // Tags indexed as plain words
        let tag_words = serde_json::from_str::<Vec<String>>(&tags)
            .unwrap_or_default()
            .join(" ");
        tx.execute(
            "INSERT INTO memory_fts (entry_id, content, entry_key, tags)
             VALUES (?1, ?2, ?3, ?4)",
            params![entry_id, content, key, tag_words],
        )?;
        Ok(())
    }

    fn delete_fts_row(tx: &rusqlite::Transaction<'_>, entry_id: &str) -> rusqlite::Result<()> {
        tx.execute(
            "DELETE FROM memory_fts WHERE entry_id = ?1",
            params![entry_id],
        )?;
        Ok(())
    }

    /// Verify an embedding fits the index before any row is written.
    fn check_embedding(&self, id: Option<&str>, embedding: Option<&[f32]>) -> Result<()> {
        let Some(vector) = embedding else {
            return Ok(());
        };
        if vector.len() != self.index.dimensions() {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.index.dimensions(),
                got: vector.len(),
            }
            .into());
        }
        let replacing = id.map(|id| self.index.contains(id)).unwrap_or(false);
        if !replacing && self.index.len() >= self.config.index.max_elements {
            return Err(VectorIndexError::IndexFull {
                capacity: self.config.index.max_elements,
            }
            .into());
        }
        Ok(())
    }

    fn sync_index(&self, id: &str, embedding: Option<&[f32]>) {
        match embedding {
            Some(vector) => {
                if let Err(e) = self.index.add_point(id, vector) {
                    tracing::warn!(%id, error = %e, "failed to index embedding");
                }
            }
            None => {
                self.index.remove_point(id);
            }
        }
    }

    // ========================================================================
    // ENTRY OPERATIONS
    // ========================================================================

    /// Upsert by id. A (namespace, key) collision with a different id fails
    /// with `Conflict`. The FTS row is maintained in the same transaction.
    pub fn store(&self, input: EntryInput) -> Result<Entry> {
        input.validate()?;
        self.check_embedding(input.id.as_deref(), input.embedding.as_deref())?;

        let id = input
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = epoch_millis();
        let embedding = input.embedding.clone();

        {
            let mut conn = self.writer()?;
            let tx = conn.transaction()?;

            let key_owner: Option<String> = tx
                .query_row(
                    "SELECT id FROM memory_entries WHERE namespace = ?1 AND key = ?2",
                    params![input.namespace, input.key],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(owner) = key_owner {
                if owner != id {
                    return Err(StorageError::Conflict {
                        namespace: input.namespace,
                        key: input.key,
                    });
                }
            }

            let exists: bool = tx
                .query_row(
                    "SELECT 1 FROM memory_entries WHERE id = ?1",
                    params![id],
                    |_| Ok(true),
                )
                .optional()?
                .unwrap_or(false);

            let blob = embedding.as_deref().map(vector_to_bytes);
            if exists {
                tx.execute(
                    "UPDATE memory_entries SET
                        key = ?1, namespace = ?2, content = ?3, memory_type = ?4,
                        tags = ?5, metadata = ?6, embedding = ?7, access_level = ?8,
                        refs = ?9, updated_at = ?10, version = version + 1
                     WHERE id = ?11",
                    params![
                        input.key,
                        input.namespace,
                        input.content,
                        input.memory_type.as_str(),
                        Self::json_text(&input.tags),
                        Self::json_text(&input.metadata),
                        blob,
                        input.access_level.as_str(),
                        Self::json_text(&input.references),
                        now,
                        id,
                    ],
                )?;
            } else {
                tx.execute(
                    "INSERT INTO memory_entries (
                        id, key, namespace, content, memory_type, tags, metadata,
                        embedding, access_level, refs,
                        created_at, updated_at, last_accessed_at, version, access_count
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11, ?11, 1, 0)",
                    params![
                        id,
                        input.key,
                        input.namespace,
                        input.content,
                        input.memory_type.as_str(),
                        Self::json_text(&input.tags),
                        Self::json_text(&input.metadata),
                        blob,
                        input.access_level.as_str(),
                        Self::json_text(&input.references),
                        now,
                    ],
                )?;
            }

            Self::write_fts_row(&tx, &id)?;
            tx.commit()?;
        }

        self.sync_index(&id, embedding.as_deref());

        let entry = self
            .fetch_entry(&id)?
            .ok_or_else(|| StorageError::NotFound(id.clone()))?;
        self.emit(MemoryEvent::EntryStored {
            id: entry.id.clone(),
            namespace: entry.namespace.clone(),
        });
        Ok(entry)
    }

    /// Point lookup by id without touching access bookkeeping.
    pub fn peek(&self, id: &str) -> Result<Option<Entry>> {
        self.fetch_entry(id)
    }

    /// Bump access bookkeeping without reading the row. Returns whether
    /// the id exists.
    pub fn record_access(&self, id: &str) -> Result<bool> {
        let writer = self.writer()?;
        let rows = writer.execute(
            "UPDATE memory_entries
             SET access_count = access_count + 1, last_accessed_at = ?1
             WHERE id = ?2",
            params![epoch_millis(), id],
        )?;
        Ok(rows > 0)
    }

    /// Point lookup by id; bumps access bookkeeping.
    pub fn get(&self, id: &str) -> Result<Option<Entry>> {
        match self.fetch_entry(id)? {
            Some(mut entry) => {
                self.touch(&mut entry)?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Lookup by the unique (namespace, key) pair; bumps access bookkeeping.
    pub fn get_by_key(&self, namespace: &str, key: &str) -> Result<Option<Entry>> {
        match self.fetch_entry_by_key(namespace, key)? {
            Some(mut entry) => {
                self.touch(&mut entry)?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Field-wise partial update. Bumps `version` and `updated_at`.
    /// Returns `None` when the id is unknown.
    pub fn update(&self, id: &str, patch: EntryPatch) -> Result<Option<Entry>> {
        let Some(current) = self.fetch_entry(id)? else {
            return Ok(None);
        };
        self.check_embedding(Some(id), patch.embedding.as_deref())?;

        let content = patch.content.unwrap_or(current.content);
        let memory_type = patch.memory_type.unwrap_or(current.memory_type);
        let tags = patch.tags.unwrap_or(current.tags);
        let metadata = patch.metadata.unwrap_or(current.metadata);
        let embedding = patch.embedding.or(current.embedding);
        let access_level = patch.access_level.unwrap_or(current.access_level);
        let references = patch.references.unwrap_or(current.references);
        let now = epoch_millis();

        {
            let mut conn = self.writer()?;
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE memory_entries SET
                    content = ?1, memory_type = ?2, tags = ?3, metadata = ?4,
                    embedding = ?5, access_level = ?6, refs = ?7,
                    updated_at = ?8, version = version + 1
                 WHERE id = ?9",
                params![
                    content,
                    memory_type.as_str(),
                    Self::json_text(&tags),
                    Self::json_text(&metadata),
                    embedding.as_deref().map(vector_to_bytes),
                    access_level.as_str(),
                    Self::json_text(&references),
                    now,
                    id,
                ],
            )?;
            Self::write_fts_row(&tx, id)?;
            tx.commit()?;
        }

        self.sync_index(id, embedding.as_deref());
        self.emit(MemoryEvent::EntryUpdated { id: id.to_string() });
        self.fetch_entry(id)
    }

    /// Delete by id. Returns whether a row was removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let removed = {
            let mut conn = self.writer()?;
            let tx = conn.transaction()?;
            Self::delete_fts_row(&tx, id)?;
            let rows = tx.execute("DELETE FROM memory_entries WHERE id = ?1", params![id])?;
            tx.commit()?;
            rows > 0
        };

        if removed {
            self.index.remove_point(id);
            self.emit(MemoryEvent::EntryDeleted { id: id.to_string() });
        }
        Ok(removed)
    }

    /// Insert many entries in one transaction, all or nothing. Empty input
    /// is a no-op. Emits one aggregate event.
    pub fn bulk_insert(&self, inputs: Vec<EntryInput>) -> Result<Vec<Entry>> {
        if inputs.is_empty() {
            return Ok(vec![]);
        }
        for input in &inputs {
            input.validate()?;
            self.check_embedding(input.id.as_deref(), input.embedding.as_deref())?;
        }

        let now = epoch_millis();
        let mut prepared: Vec<(String, EntryInput)> = Vec::with_capacity(inputs.len());
        for input in inputs {
            let id = input
                .id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            prepared.push((id, input));
        }

        {
            let mut conn = self.writer()?;
            let tx = conn.transaction()?;
            for (id, input) in &prepared {
                let key_owner: Option<String> = tx
                    .query_row(
                        "SELECT id FROM memory_entries WHERE namespace = ?1 AND key = ?2",
                        params![input.namespace, input.key],
                        |row| row.get(0),
                    )
                    .optional()?;
                if key_owner.is_some_and(|owner| owner != *id) {
                    return Err(StorageError::Conflict {
                        namespace: input.namespace.clone(),
                        key: input.key.clone(),
                    });
                }

                tx.execute(
                    "INSERT INTO memory_entries (
                        id, key, namespace, content, memory_type, tags, metadata,
                        embedding, access_level, refs,
                        created_at, updated_at, last_accessed_at, version, access_count
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11, ?11, 1, 0)",
                    params![
                        id,
                        input.key,
                        input.namespace,
                        input.content,
                        input.memory_type.as_str(),
                        Self::json_text(&input.tags),
                        Self::json_text(&input.metadata),
                        input.embedding.as_deref().map(vector_to_bytes),
                        input.access_level.as_str(),
                        Self::json_text(&input.references),
                        now,
                    ],
                )?;
                Self::write_fts_row(&tx, id)?;
            }
            tx.commit()?;
        }

        let mut stored = Vec::with_capacity(prepared.len());
        for (id, input) in &prepared {
            self.sync_index(id, input.embedding.as_deref());
            if let Some(entry) = self.fetch_entry(id)? {
                stored.push(entry);
            }
        }
        self.emit(MemoryEvent::BulkInserted {
            count: stored.len(),
        });
        Ok(stored)
    }

    /// Delete many ids in one transaction. Returns the count removed.
    pub fn bulk_delete(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut removed = 0usize;
        let mut removed_ids: Vec<&String> = Vec::new();
        {
            let mut conn = self.writer()?;
            let tx = conn.transaction()?;
            for id in ids {
                Self::delete_fts_row(&tx, id)?;
                let rows =
                    tx.execute("DELETE FROM memory_entries WHERE id = ?1", params![id])?;
                if rows > 0 {
                    removed += 1;
                    removed_ids.push(id);
                }
            }
            tx.commit()?;
        }

        for id in removed_ids {
            self.index.remove_point(id);
        }
        self.emit(MemoryEvent::BulkDeleted { count: removed });
        Ok(removed)
    }

    // ========================================================================
    // QUERY COMPILER
    // ========================================================================

    /// Push the composable filter clauses shared by all query modes.
    fn push_filters(
        q: &MemoryQuery,
        include_content: bool,
        clauses: &mut Vec<String>,
        args: &mut Vec<Box<dyn ToSql>>,
    ) {
        if let Some(namespace) = &q.namespace {
            clauses.push("e.namespace = ?".to_string());
            args.push(Box::new(namespace.clone()));
        }
        if let Some(memory_type) = q.memory_type {
            clauses.push("e.memory_type = ?".to_string());
            args.push(Box::new(memory_type.as_str().to_string()));
        }
        if let Some(before) = q.created_before {
            clauses.push("e.created_at < ?".to_string());
            args.push(Box::new(before));
        }
        if let Some(after) = q.created_after {
            clauses.push("e.created_at > ?".to_string());
            args.push(Box::new(after));
        }
        if include_content {
            if let Some(content) = &q.content {
                clauses.push("e.content LIKE '%' || ? || '%'".to_string());
                args.push(Box::new(content.clone()));
            }
        }
        for tag in &q.tags {
            clauses.push(
                "EXISTS (SELECT 1 FROM json_each(e.tags) WHERE json_each.value = ?)".to_string(),
            );
            args.push(Box::new(tag.clone()));
        }
    }

    fn select_entries(
        &self,
        sql: &str,
        args: &[Box<dyn ToSql>],
    ) -> Result<Vec<Entry>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(sql)?;
        let rows = stmt.query_map(
            params_from_iter(args.iter().map(|a| a.as_ref())),
            Self::row_to_entry,
        )?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Run a query descriptor. Ties rank by `updated_at` DESC, then `id`.
    pub fn query(&self, q: &MemoryQuery) -> Result<Vec<Entry>> {
        match q.query_type {
            QueryType::Exact => {
                let key = q.key.clone().unwrap_or_default();
                let mut clauses = vec!["e.key = ?".to_string()];
                let mut args: Vec<Box<dyn ToSql>> = vec![Box::new(key)];
                Self::push_filters(q, true, &mut clauses, &mut args);
                args.push(Box::new(q.limit as i64));
                self.select_entries(
                    &format!(
                        "SELECT e.* FROM memory_entries e WHERE {}
                         ORDER BY e.updated_at DESC, e.id ASC LIMIT ?",
                        clauses.join(" AND ")
                    ),
                    &args,
                )
            }
            QueryType::Prefix => {
                let prefix = q.key_prefix.clone().unwrap_or_default();
                let mut clauses = vec!["e.key LIKE ? || '%'".to_string()];
                let mut args: Vec<Box<dyn ToSql>> = vec![Box::new(prefix)];
                Self::push_filters(q, true, &mut clauses, &mut args);
                args.push(Box::new(q.limit as i64));
                self.select_entries(
                    &format!(
                        "SELECT e.* FROM memory_entries e WHERE {}
                         ORDER BY e.updated_at DESC, e.id ASC LIMIT ?",
                        clauses.join(" AND ")
                    ),
                    &args,
                )
            }
            QueryType::Keyword => self.keyword_query(q),
            QueryType::Semantic => self.semantic_query(q),
            QueryType::Hybrid => {
                // Union of keyword matches and filter-only rows, keyword first.
                let mut merged = if q.content.is_some() {
                    self.keyword_query(q)?
                } else {
                    vec![]
                };

                let mut clauses: Vec<String> = vec![];
                let mut args: Vec<Box<dyn ToSql>> = vec![];
                Self::push_filters(q, false, &mut clauses, &mut args);
                let where_sql = if clauses.is_empty() {
                    String::new()
                } else {
                    format!("WHERE {}", clauses.join(" AND "))
                };
                args.push(Box::new(q.limit as i64));
                let all_rows = self.select_entries(
                    &format!(
                        "SELECT e.* FROM memory_entries e {where_sql}
                         ORDER BY e.updated_at DESC, e.id ASC LIMIT ?"
                    ),
                    &args,
                )?;

                for entry in all_rows {
                    if !merged.iter().any(|e| e.id == entry.id) {
                        merged.push(entry);
                    }
                }
                merged.truncate(q.limit);
                Ok(merged)
            }
        }
    }

    /// FTS match over content/key/tags, ranked by the FTS score.
    fn keyword_query(&self, q: &MemoryQuery) -> Result<Vec<Entry>> {
        let text = q.content.clone().unwrap_or_default();
        let sanitized = sanitize_fts_query(&text);
        if sanitized.is_empty() {
            return Ok(vec![]);
        }

        let mut clauses = vec!["memory_fts MATCH ?".to_string()];
        let mut args: Vec<Box<dyn ToSql>> = vec![Box::new(sanitized)];
        Self::push_filters(q, false, &mut clauses, &mut args);
        args.push(Box::new(q.limit as i64));

        self.select_entries(
            &format!(
                "SELECT e.* FROM memory_entries e
                 JOIN memory_fts ON e.id = memory_fts.entry_id
                 WHERE {}
                 ORDER BY bm25(memory_fts) ASC, e.updated_at DESC, e.id ASC
                 LIMIT ?",
                clauses.join(" AND ")
            ),
            &args,
        )
    }

    /// Vector search composed with the descriptor filters. Entries without
    /// an embedding are never candidates (they are not in the index).
    fn semantic_query(&self, q: &MemoryQuery) -> Result<Vec<Entry>> {
        let Some(embedding) = &q.query_embedding else {
            return Err(StorageError::MissingQueryEmbedding);
        };

        // Over-fetch so post-filters can still fill the limit.
        let hits = self.index.search(embedding, q.limit * 4 + 16, None)?;
        let mut scored: Vec<(f32, Entry)> = Vec::new();
        for (id, distance) in hits {
            let Some(entry) = self.fetch_entry(&id)? else {
                continue;
            };
            if Self::entry_passes_filters(&entry, q) {
                scored.push((distance, entry));
            }
        }
        scored.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then(b.1.updated_at.cmp(&a.1.updated_at))
                .then(a.1.id.cmp(&b.1.id))
        });
        Ok(scored
            .into_iter()
            .take(q.limit)
            .map(|(_, entry)| entry)
            .collect())
    }

    fn entry_passes_filters(entry: &Entry, q: &MemoryQuery) -> bool {
        if let Some(namespace) = &q.namespace {
            if &entry.namespace != namespace {
                return false;
            }
        }
        if let Some(memory_type) = q.memory_type {
            if entry.memory_type != memory_type {
                return false;
            }
        }
        if let Some(before) = q.created_before {
            if entry.created_at >= before {
                return false;
            }
        }
        if let Some(after) = q.created_after {
            if entry.created_at <= after {
                return false;
            }
        }
        if let Some(content) = &q.content {
            if !entry.content.contains(content.as_str()) {
                return false;
            }
        }
        q.tags.iter().all(|tag| entry.tags.contains(tag))
    }

    // ========================================================================
    // VECTOR SEARCH
    // ========================================================================

    /// k-NN over entry embeddings with namespace/type post-filters and an
    /// optional similarity threshold.
    pub fn search(&self, query_vector: &[f32], opts: &SearchOptions) -> Result<Vec<SearchResult>> {
        let filtered = opts.namespace.is_some() || opts.memory_type.is_some();
        let fetch_k = if filtered { opts.k * 4 + 16 } else { opts.k };
        let hits = self.index.search(query_vector, fetch_k, None)?;

        let metric = self.config.index.metric;
        let mut results = Vec::new();
        for (id, distance) in hits {
            if results.len() >= opts.k {
                break;
            }
            let Some(entry) = self.fetch_entry(&id)? else {
                continue;
            };
            if let Some(namespace) = &opts.namespace {
                if &entry.namespace != namespace {
                    continue;
                }
            }
            if let Some(memory_type) = opts.memory_type {
                if entry.memory_type != memory_type {
                    continue;
                }
            }
            let similarity = metric.similarity(distance);
            if let Some(threshold) = opts.threshold {
                if similarity < threshold {
                    continue;
                }
            }
            results.push(SearchResult {
                entry,
                distance,
                similarity,
            });
        }
        Ok(results)
    }

    /// Stats of the embedded vector index.
    pub fn index_stats(&self) -> VectorIndexStats {
        self.index.stats()
    }

    /// Clear and re-insert the vector index from stored embeddings.
    pub fn rebuild_index(&self) -> Result<usize> {
        let reader = self.reader()?;
        let mut stmt = reader
            .prepare("SELECT id, embedding FROM memory_entries WHERE embedding IS NOT NULL")?;
        let entries: Vec<(String, Vec<f32>)> = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .filter_map(|r| r.ok())
            .filter_map(|(id, blob)| vector_from_bytes(&blob).map(|v| (id, v)))
            .collect();
        drop(stmt);
        drop(reader);

        Ok(self.index.rebuild(&entries)?)
    }

    // ========================================================================
    // NAMESPACE AND MAINTENANCE OPERATIONS
    // ========================================================================

    /// Namespaces currently in use.
    pub fn list_namespaces(&self) -> Result<Vec<String>> {
        let reader = self.reader()?;
        let mut stmt =
            reader.prepare("SELECT DISTINCT namespace FROM memory_entries ORDER BY namespace")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut namespaces = Vec::new();
        for row in rows {
            namespaces.push(row?);
        }
        Ok(namespaces)
    }

    /// Entry count, optionally scoped to one namespace.
    pub fn count(&self, namespace: Option<&str>) -> Result<i64> {
        let reader = self.reader()?;
        let count = match namespace {
            Some(ns) => reader.query_row(
                "SELECT COUNT(*) FROM memory_entries WHERE namespace = ?1",
                params![ns],
                |row| row.get(0),
            )?,
            None => reader.query_row("SELECT COUNT(*) FROM memory_entries", [], |row| row.get(0))?,
        };
        Ok(count)
    }

    /// Delete every entry in a namespace. Returns the count removed.
    pub fn clear_namespace(&self, namespace: &str) -> Result<usize> {
        let ids: Vec<String> = {
            let reader = self.reader()?;
            let mut stmt =
                reader.prepare("SELECT id FROM memory_entries WHERE namespace = ?1")?;
            let rows = stmt.query_map(params![namespace], |row| row.get(0))?;
            rows.filter_map(|r| r.ok()).collect()
        };

        let removed = {
            let mut conn = self.writer()?;
            let tx = conn.transaction()?;
            for id in &ids {
                Self::delete_fts_row(&tx, id)?;
            }
            let rows = tx.execute(
                "DELETE FROM memory_entries WHERE namespace = ?1",
                params![namespace],
            )?;
            tx.commit()?;
            rows
        };

        for id in &ids {
            self.index.remove_point(id);
        }
        self.emit(MemoryEvent::NamespaceCleared {
            namespace: namespace.to_string(),
            count: removed,
        });
        Ok(removed)
    }

    /// Aggregate statistics.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let reader = self.reader()?;
        let total_entries: i64 =
            reader.query_row("SELECT COUNT(*) FROM memory_entries", [], |row| row.get(0))?;

        let mut by_namespace = HashMap::new();
        {
            let mut stmt = reader
                .prepare("SELECT namespace, COUNT(*) FROM memory_entries GROUP BY namespace")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (ns, count) = row?;
                by_namespace.insert(ns, count);
            }
        }

        let mut by_type = HashMap::new();
        {
            let mut stmt = reader
                .prepare("SELECT memory_type, COUNT(*) FROM memory_entries GROUP BY memory_type")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (ty, count) = row?;
                by_type.insert(ty, count);
            }
        }

        let page_count: i64 =
            reader.query_row("PRAGMA page_count", [], |row| row.get(0))?;
        let page_size: i64 = reader.query_row("PRAGMA page_size", [], |row| row.get(0))?;

        Ok(StoreStats {
            total_entries,
            entries_by_namespace: by_namespace,
            entries_by_type: by_type,
            memory_usage: page_count * page_size,
        })
    }

    /// Aggregate health with per-component sub-statuses.
    pub fn health_check(&self) -> HealthReport {
        let mut components = Vec::new();

        let storage_ok = self
            .reader()
            .and_then(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                    .map_err(StorageError::from)
            })
            .is_ok();
        components.push(ComponentHealth {
            name: "storage".to_string(),
            healthy: storage_ok,
            detail: if storage_ok {
                format!("db at {}", self.db_path.display())
            } else {
                "database unreachable".to_string()
            },
        });

        let fts = self.reader().and_then(|conn| {
            conn.query_row("SELECT COUNT(*) FROM memory_fts", [], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(StorageError::from)
        });
        components.push(match fts {
            Ok(rows) => ComponentHealth {
                name: "fts".to_string(),
                healthy: true,
                detail: format!("{rows} rows, tokenizer {}", self.active_tokenizer()),
            },
            Err(e) => ComponentHealth {
                name: "fts".to_string(),
                healthy: false,
                detail: e.to_string(),
            },
        });

        let index_stats = self.index.stats();
        components.push(ComponentHealth {
            name: "vector-index".to_string(),
            healthy: true,
            detail: format!("{} vectors", index_stats.vector_count),
        });

        HealthReport {
            healthy: components.iter().all(|c| c.healthy),
            components,
        }
    }

    /// Drop and repopulate the FTS table from the canonical entry rows.
    pub fn rebuild_fts_index(&self) -> Result<usize> {
        let mut conn = self.writer()?;
        let tokenize = self.config.tokenizer.as_sql().replace('\'', "''");
        let tx = conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS memory_fts;
             CREATE VIRTUAL TABLE memory_fts USING fts5(
                entry_id UNINDEXED,
                content,
                entry_key,
                tags,
                tokenize='{tokenize}'
             );"
        ))?;

        let rows: Vec<(String, String, String, String)> = {
            let mut stmt = tx.prepare("SELECT id, content, key, tags FROM memory_entries")?;
            let mapped = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?;
            mapped.filter_map(|r| r.ok()).collect()
        };

        let mut count = 0usize;
        for (id, content, key, tags) in rows {
            let tag_words = serde_json::from_str::<Vec<String>>(&tags)
                .unwrap_or_default()
                .join(" ");
            tx.execute(
                "INSERT INTO memory_fts (entry_id, content, entry_key, tags)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, content, key, tag_words],
            )?;
            count += 1;
        }
        tx.commit()?;

        tracing::info!(count, "FTS index rebuilt");
        Ok(count)
    }

    /// Merge FTS segments and refresh the query planner's statistics.
    pub fn optimize(&self) -> Result<()> {
        let writer = self.writer()?;
        writer.execute_batch(
            "INSERT INTO memory_fts(memory_fts) VALUES('optimize');
             PRAGMA optimize;",
        )?;
        Ok(())
    }

    // ========================================================================
    // SESSIONS
    // ========================================================================

    fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
        let status: String = row.get("status")?;
        Ok(Session {
            id: row.get("id")?,
            session_id: row.get("session_id")?,
            project: row.get("project")?,
            prompt: row.get("prompt")?,
            started_at: row.get("started_at")?,
            ended_at: row.get("ended_at")?,
            observation_count: row.get("observation_count")?,
            summary: row.get("summary")?,
            status: SessionStatus::parse_name(&status),
        })
    }

    /// Create the session row if absent; idempotent by `session_id`.
    /// A later prompt backfills the initial prompt when it was unknown.
    pub fn ensure_session(
        &self,
        session_id: &str,
        project: &str,
        prompt: Option<&str>,
    ) -> Result<Session> {
        {
            let writer = self.writer()?;
            writer.execute(
                "INSERT INTO sessions (session_id, project, prompt, started_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(session_id) DO NOTHING",
                params![session_id, project, prompt, epoch_millis()],
            )?;
            if let Some(prompt) = prompt {
                writer.execute(
                    "UPDATE sessions SET prompt = COALESCE(prompt, ?1) WHERE session_id = ?2",
                    params![prompt, session_id],
                )?;
            }
        }
        self.get_session(session_id)?
            .ok_or_else(|| StorageError::NotFound(session_id.to_string()))
    }

    pub fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let reader = self.reader()?;
        let session = reader
            .query_row(
                "SELECT * FROM sessions WHERE session_id = ?1",
                params![session_id],
                Self::row_to_session,
            )
            .optional()?;
        Ok(session)
    }

    /// Most recent sessions, optionally per project.
    pub fn recent_sessions(&self, project: Option<&str>, limit: usize) -> Result<Vec<Session>> {
        let reader = self.reader()?;
        let mut sessions = Vec::new();
        match project {
            Some(project) => {
                let mut stmt = reader.prepare(
                    "SELECT * FROM sessions WHERE project = ?1
                     ORDER BY started_at DESC, id DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![project, limit as i64], Self::row_to_session)?;
                for row in rows {
                    sessions.push(row?);
                }
            }
            None => {
                let mut stmt = reader.prepare(
                    "SELECT * FROM sessions ORDER BY started_at DESC, id DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit as i64], Self::row_to_session)?;
                for row in rows {
                    sessions.push(row?);
                }
            }
        }
        Ok(sessions)
    }

    /// Close a session: record end time, summary text, and final status.
    pub fn finish_session(
        &self,
        session_id: &str,
        summary: Option<&str>,
        status: SessionStatus,
    ) -> Result<()> {
        let writer = self.writer()?;
        writer.execute(
            "UPDATE sessions SET ended_at = ?1, summary = ?2, status = ?3
             WHERE session_id = ?4",
            params![epoch_millis(), summary, status.as_str(), session_id],
        )?;
        Ok(())
    }

    // ========================================================================
    // PROMPTS
    // ========================================================================

    /// Append the next prompt of a session. Numbers are dense from 1; the
    /// unique (session_id, prompt_number) constraint backs the invariant.
    pub fn append_prompt(&self, session_id: &str, prompt_text: &str) -> Result<UserPrompt> {
        let now = epoch_millis();
        let mut conn = self.writer()?;
        let tx = conn.transaction()?;
        let next: i64 = tx.query_row(
            "SELECT COALESCE(MAX(prompt_number), 0) + 1 FROM user_prompts WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO user_prompts (session_id, prompt_number, prompt_text, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![session_id, next, prompt_text, now],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(UserPrompt {
            id,
            session_id: session_id.to_string(),
            prompt_number: next,
            prompt_text: prompt_text.to_string(),
            created_at: now,
        })
    }

    pub fn prompt_count(&self, session_id: &str) -> Result<i64> {
        let reader = self.reader()?;
        let count = reader.query_row(
            "SELECT COUNT(*) FROM user_prompts WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn row_to_prompt(row: &Row<'_>) -> rusqlite::Result<UserPrompt> {
        Ok(UserPrompt {
            id: row.get("id")?,
            session_id: row.get("session_id")?,
            prompt_number: row.get("prompt_number")?,
            prompt_text: row.get("prompt_text")?,
            created_at: row.get("created_at")?,
        })
    }

    /// A session's prompts in ascending number order.
    pub fn prompts_for_session(&self, session_id: &str) -> Result<Vec<UserPrompt>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM user_prompts WHERE session_id = ?1 ORDER BY prompt_number ASC",
        )?;
        let rows = stmt.query_map(params![session_id], Self::row_to_prompt)?;
        let mut prompts = Vec::new();
        for row in rows {
            prompts.push(row?);
        }
        Ok(prompts)
    }

    /// Most recent prompts across a project's sessions.
    pub fn recent_prompts(&self, project: &str, limit: usize) -> Result<Vec<UserPrompt>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT p.* FROM user_prompts p
             JOIN sessions s ON s.session_id = p.session_id
             WHERE s.project = ?1
             ORDER BY p.created_at DESC, p.id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![project, limit as i64], Self::row_to_prompt)?;
        let mut prompts = Vec::new();
        for row in rows {
            prompts.push(row?);
        }
        Ok(prompts)
    }

    // ========================================================================
    // OBSERVATIONS
    // ========================================================================

    fn row_to_observation(row: &Row<'_>) -> rusqlite::Result<Observation> {
        let kind: String = row.get("kind")?;
        let files_read: String = row.get("files_read")?;
        let files_modified: String = row.get("files_modified")?;
        let facts: String = row.get("facts")?;
        let concepts: String = row.get("concepts")?;
        Ok(Observation {
            id: row.get("id")?,
            session_id: row.get("session_id")?,
            project: row.get("project")?,
            tool_name: row.get("tool_name")?,
            tool_input: row.get("tool_input")?,
            tool_response: row.get("tool_response")?,
            cwd: row.get("cwd")?,
            timestamp: row.get("timestamp")?,
            kind: ObservationKind::parse_name(&kind),
            title: row.get("title")?,
            subtitle: row.get("subtitle")?,
            narrative: row.get("narrative")?,
            files_read: serde_json::from_str(&files_read).unwrap_or_default(),
            files_modified: serde_json::from_str(&files_modified).unwrap_or_default(),
            facts: serde_json::from_str(&facts).unwrap_or_default(),
            concepts: serde_json::from_str(&concepts).unwrap_or_default(),
            prompt_number: row.get("prompt_number")?,
        })
    }

    /// Persist an observation and bump the session's observation count in
    /// the same transaction.
    pub fn insert_observation(&self, obs: &Observation) -> Result<()> {
        let mut conn = self.writer()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO observations (
                id, session_id, project, tool_name, tool_input, tool_response,
                cwd, timestamp, kind, title, subtitle, narrative,
                files_read, files_modified, facts, concepts, prompt_number
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                obs.id,
                obs.session_id,
                obs.project,
                obs.tool_name,
                obs.tool_input,
                obs.tool_response,
                obs.cwd,
                obs.timestamp,
                obs.kind.as_str(),
                obs.title,
                obs.subtitle,
                obs.narrative,
                Self::json_text(&obs.files_read),
                Self::json_text(&obs.files_modified),
                Self::json_text(&obs.facts),
                Self::json_text(&obs.concepts),
                obs.prompt_number,
            ],
        )?;
        tx.execute(
            "UPDATE sessions SET observation_count = observation_count + 1
             WHERE session_id = ?1",
            params![obs.session_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_observation(&self, id: &str) -> Result<Option<Observation>> {
        let reader = self.reader()?;
        let obs = reader
            .query_row(
                "SELECT * FROM observations WHERE id = ?1",
                params![id],
                Self::row_to_observation,
            )
            .optional()?;
        Ok(obs)
    }

    /// A session's observations, in capture order (timestamp, then id).
    pub fn observations_for_session(&self, session_id: &str) -> Result<Vec<Observation>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM observations WHERE session_id = ?1
             ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![session_id], Self::row_to_observation)?;
        let mut observations = Vec::new();
        for row in rows {
            observations.push(row?);
        }
        Ok(observations)
    }

    pub fn recent_observations(&self, project: &str, limit: usize) -> Result<Vec<Observation>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM observations WHERE project = ?1
             ORDER BY timestamp DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![project, limit as i64], Self::row_to_observation)?;
        let mut observations = Vec::new();
        for row in rows {
            observations.push(row?);
        }
        Ok(observations)
    }

    /// Replace an observation's enrichment fields.
    pub fn update_observation_enrichment(
        &self,
        id: &str,
        subtitle: Option<&str>,
        narrative: Option<&str>,
        facts: &[String],
        concepts: &[String],
    ) -> Result<bool> {
        let writer = self.writer()?;
        let rows = writer.execute(
            "UPDATE observations SET subtitle = ?1, narrative = ?2, facts = ?3, concepts = ?4
             WHERE id = ?5",
            params![
                subtitle,
                narrative,
                Self::json_text(&facts),
                Self::json_text(&concepts),
                id
            ],
        )?;
        Ok(rows > 0)
    }

    // ========================================================================
    // SESSION SUMMARIES
    // ========================================================================

    fn row_to_summary(row: &Row<'_>) -> rusqlite::Result<SessionSummary> {
        let files_read: String = row.get("files_read")?;
        let files_modified: String = row.get("files_modified")?;
        let next_steps: String = row.get("next_steps")?;
        let notes: String = row.get("notes")?;
        Ok(SessionSummary {
            id: row.get("id")?,
            session_id: row.get("session_id")?,
            project: row.get("project")?,
            request: row.get("request")?,
            completed: row.get("completed")?,
            files_read: serde_json::from_str(&files_read).unwrap_or_default(),
            files_modified: serde_json::from_str(&files_modified).unwrap_or_default(),
            next_steps: serde_json::from_str(&next_steps).unwrap_or_default(),
            notes: serde_json::from_str(&notes).unwrap_or_default(),
            prompt_number: row.get("prompt_number")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn insert_summary(&self, summary: &SessionSummary) -> Result<SessionSummary> {
        let writer = self.writer()?;
        writer.execute(
            "INSERT INTO session_summaries (
                session_id, project, request, completed,
                files_read, files_modified, next_steps, notes,
                prompt_number, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                summary.session_id,
                summary.project,
                summary.request,
                summary.completed,
                Self::json_text(&summary.files_read),
                Self::json_text(&summary.files_modified),
                Self::json_text(&summary.next_steps),
                Self::json_text(&summary.notes),
                summary.prompt_number,
                summary.created_at,
            ],
        )?;
        let id = writer.last_insert_rowid();
        let mut stored = summary.clone();
        stored.id = id;
        Ok(stored)
    }

    pub fn summaries_for_project(&self, project: &str, limit: usize) -> Result<Vec<SessionSummary>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM session_summaries WHERE project = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![project, limit as i64], Self::row_to_summary)?;
        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }
}

// ============================================================================
// TESTS
// ============================================================================
