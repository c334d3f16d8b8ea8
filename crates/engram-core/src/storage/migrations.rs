//! Database Migrations
//!
//! Versioned, strictly additive schema history. Plain DDL runs per
//! version; column additions are guarded by a `PRAGMA table_info` probe so
//! re-running a migration is harmless. Columns are never dropped.
//!
//! The FTS virtual table is not created here: its tokenizer is chosen at
//! open time, so the engine creates it after migrations run.

use rusqlite::Connection;

/// A guarded `ALTER TABLE ADD COLUMN`
#[derive(Debug, Clone)]
pub struct ColumnAdd {
    pub table: &'static str,
    pub column: &'static str,
    /// Column declaration appended after the name
    pub decl: &'static str,
}

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// DDL to apply
    pub up: &'static str,
    /// Guarded column additions applied after `up`
    pub columns: &'static [ColumnAdd],
}

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: entries, sessions, prompts, observations",
        up: MIGRATION_V1_UP,
        columns: &[],
    },
    Migration {
        version: 2,
        description: "Session summaries and prompt linkage for observations",
        up: MIGRATION_V2_UP,
        columns: &[ColumnAdd {
            table: "observations",
            column: "prompt_number",
            decl: "INTEGER",
        }],
    },
    Migration {
        version: 3,
        description: "Entry access levels and cross-references",
        up: MIGRATION_V3_UP,
        columns: &[
            ColumnAdd {
                table: "memory_entries",
                column: "access_level",
                decl: "TEXT NOT NULL DEFAULT 'private'",
            },
            ColumnAdd {
                table: "memory_entries",
                column: "refs",
                decl: "TEXT NOT NULL DEFAULT '[]'",
            },
        ],
    },
];

/// V1: Initial schema
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS memory_entries (
    id TEXT PRIMARY KEY,
    key TEXT NOT NULL,
    namespace TEXT NOT NULL,
    content TEXT NOT NULL,
    memory_type TEXT NOT NULL DEFAULT 'semantic',
    tags TEXT NOT NULL DEFAULT '[]',
    metadata TEXT NOT NULL DEFAULT '{}',

    -- Embedding as a little-endian f32 blob; NULL when absent
    embedding BLOB,

    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    last_accessed_at INTEGER NOT NULL,
    version INTEGER NOT NULL DEFAULT 1,
    access_count INTEGER NOT NULL DEFAULT 0,

    UNIQUE (namespace, key)
);

CREATE INDEX IF NOT EXISTS idx_entries_namespace ON memory_entries(namespace);
CREATE INDEX IF NOT EXISTS idx_entries_type ON memory_entries(memory_type);
CREATE INDEX IF NOT EXISTS idx_entries_created ON memory_entries(created_at);
CREATE INDEX IF NOT EXISTS idx_entries_accessed ON memory_entries(last_accessed_at);

CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL UNIQUE,
    project TEXT NOT NULL,
    prompt TEXT,
    started_at INTEGER NOT NULL,
    ended_at INTEGER,
    observation_count INTEGER NOT NULL DEFAULT 0,
    summary TEXT,
    status TEXT NOT NULL DEFAULT 'active'
);

CREATE INDEX IF NOT EXISTS idx_sessions_project ON sessions(project);
CREATE INDEX IF NOT EXISTS idx_sessions_started ON sessions(started_at);

CREATE TABLE IF NOT EXISTS user_prompts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    prompt_number INTEGER NOT NULL,
    prompt_text TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (session_id, prompt_number)
);

CREATE INDEX IF NOT EXISTS idx_prompts_session ON user_prompts(session_id);

CREATE TABLE IF NOT EXISTS observations (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    project TEXT NOT NULL,
    tool_name TEXT NOT NULL,
    tool_input TEXT,
    tool_response TEXT,
    cwd TEXT NOT NULL DEFAULT '',
    timestamp INTEGER NOT NULL,
    kind TEXT NOT NULL DEFAULT 'other',
    title TEXT NOT NULL DEFAULT '',
    subtitle TEXT,
    narrative TEXT,
    files_read TEXT NOT NULL DEFAULT '[]',
    files_modified TEXT NOT NULL DEFAULT '[]',
    facts TEXT NOT NULL DEFAULT '[]',
    concepts TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_observations_session ON observations(session_id);
CREATE INDEX IF NOT EXISTS idx_observations_project ON observations(project);
CREATE INDEX IF NOT EXISTS idx_observations_time ON observations(timestamp);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: Session summaries; observations learn their containing prompt
const MIGRATION_V2_UP: &str = r#"
CREATE TABLE IF NOT EXISTS session_summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    project TEXT NOT NULL,
    request TEXT NOT NULL DEFAULT '',
    completed TEXT NOT NULL DEFAULT '',
    files_read TEXT NOT NULL DEFAULT '[]',
    files_modified TEXT NOT NULL DEFAULT '[]',
    next_steps TEXT NOT NULL DEFAULT '[]',
    notes TEXT NOT NULL DEFAULT '[]',
    prompt_number INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_summaries_session ON session_summaries(session_id);
CREATE INDEX IF NOT EXISTS idx_summaries_project ON session_summaries(project);

UPDATE schema_version SET version = 2, applied_at = datetime('now');
"#;

/// V3: Access levels and references (columns added via guarded probe)
const MIGRATION_V3_UP: &str = r#"
UPDATE schema_version SET version = 3, applied_at = datetime('now');
"#;

/// Probe `PRAGMA table_info` for a column.
pub fn column_exists(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Get current schema version from database
pub fn get_current_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations. Returns the count applied.
pub fn apply_migrations(conn: &Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            conn.execute_batch(migration.up)?;

            for add in migration.columns {
                if !column_exists(conn, add.table, add.column)? {
                    conn.execute_batch(&format!(
                        "ALTER TABLE {} ADD COLUMN {} {};",
                        add.table, add.column, add.decl
                    ))?;
                }
            }

            applied += 1;
        }
    }

    Ok(applied)
}
