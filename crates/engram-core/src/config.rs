//! Engine Configuration
//!
//! One `MemoryConfig` feeds the storage engine, cache tier, and vector
//! index. The database lives in `<base_dir>/.claude/memory/<db_file>`;
//! with no base dir the platform data directory is used instead.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::cache::CacheConfig;
use crate::vector::HnswConfig;

/// Default database file name
pub const DEFAULT_DB_FILE: &str = "memory.db";

/// Relative directory under the project base dir
const MEMORY_DIR: &str = ".claude/memory";

// ============================================================================
// FTS TOKENIZER
// ============================================================================

/// FTS5 tokenizer selection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FtsTokenizer {
    /// Default Latin-script tokenizer
    #[default]
    Unicode61,
    /// English stemming
    Porter,
    /// Character trigrams; CJK-safe
    Trigram,
    /// Caller-supplied tokenizer spec, passed through verbatim
    Custom(String),
}

impl FtsTokenizer {
    /// The `tokenize=` argument for the virtual table DDL.
    pub fn as_sql(&self) -> &str {
        match self {
            FtsTokenizer::Unicode61 => "unicode61",
            FtsTokenizer::Porter => "porter unicode61",
            FtsTokenizer::Trigram => "trigram",
            FtsTokenizer::Custom(spec) => spec,
        }
    }

    /// Short display name reported by the engine.
    pub fn name(&self) -> &str {
        match self {
            FtsTokenizer::Unicode61 => "unicode61",
            FtsTokenizer::Porter => "porter",
            FtsTokenizer::Trigram => "trigram",
            FtsTokenizer::Custom(spec) => spec,
        }
    }

    /// Only the trigram tokenizer handles CJK text without word breaks.
    pub fn is_cjk_optimized(&self) -> bool {
        matches!(self, FtsTokenizer::Trigram)
    }
}

// ============================================================================
// MEMORY CONFIG
// ============================================================================

/// Top-level engine configuration
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Project base directory; `None` selects the platform data dir
    pub base_dir: Option<PathBuf>,
    /// Database file name inside the memory directory
    pub db_file: String,
    /// FTS tokenizer
    pub tokenizer: FtsTokenizer,
    /// Vector index tuning
    pub index: HnswConfig,
    /// Entry cache tuning
    pub cache: CacheConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            db_file: DEFAULT_DB_FILE.to_string(),
            tokenizer: FtsTokenizer::default(),
            index: HnswConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl MemoryConfig {
    /// Config rooted at a project directory.
    pub fn for_project(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Resolve the memory directory, creating it when missing.
    pub fn memory_dir(&self) -> std::io::Result<PathBuf> {
        let dir = match &self.base_dir {
            Some(base) => base.join(MEMORY_DIR),
            None => ProjectDirs::from("dev", "engram", "engram")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .ok_or_else(|| {
                    std::io::Error::other("could not determine a platform data directory")
                })?,
        };
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Full path of the database file, creating parent directories.
    pub fn db_path(&self) -> std::io::Result<PathBuf> {
        Ok(self.memory_dir()?.join(&self.db_file))
    }
}
