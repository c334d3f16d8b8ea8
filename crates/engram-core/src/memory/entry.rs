//! Entry - The primary memory record
//!
//! Each entry is addressable by a globally unique `id` and by its
//! (`namespace`, `key`) pair. Mutating updates bump `version`; reads bump
//! `access_count` and `last_accessed_at`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::epoch_millis;

/// Maximum accepted key length, in characters.
pub const MAX_KEY_LENGTH: usize = 500;

// ============================================================================
// MEMORY TYPES
// ============================================================================

/// Classification of a memory entry
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    /// Facts and knowledge detached from any one event
    #[default]
    Semantic,
    /// Things that happened: events, sessions, conversations
    Episodic,
    /// How-to knowledge: procedures, patterns, recipes
    Procedural,
}

impl MemoryType {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Semantic => "semantic",
            MemoryType::Episodic => "episodic",
            MemoryType::Procedural => "procedural",
        }
    }

    /// Parse from string name; unknown names fall back to semantic
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "episodic" => MemoryType::Episodic,
            "procedural" => MemoryType::Procedural,
            _ => MemoryType::Semantic,
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Access level tag carried by each entry.
///
/// Opaque to the engine; stored and returned verbatim. The constructors
/// exist so callers share spellings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessLevel(pub String);

impl AccessLevel {
    pub fn private() -> Self {
        AccessLevel("private".to_string())
    }

    pub fn shared() -> Self {
        AccessLevel("shared".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AccessLevel {
    fn default() -> Self {
        AccessLevel::private()
    }
}

impl From<&str> for AccessLevel {
    fn from(s: &str) -> Self {
        AccessLevel(s.to_string())
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Invariant violations detected before a record reaches the database
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Key must be non-empty
    #[error("entry key must not be empty")]
    EmptyKey,
    /// Key exceeds [`MAX_KEY_LENGTH`]
    #[error("entry key exceeds {MAX_KEY_LENGTH} characters (got {0})")]
    KeyTooLong(usize),
    /// Namespace must be non-empty
    #[error("entry namespace must not be empty")]
    EmptyNamespace,
    /// Content must be non-empty
    #[error("entry content must not be empty")]
    EmptyContent,
}

// ============================================================================
// ENTRY
// ============================================================================

/// A memory entry
///
/// Invariants: (`namespace`, `key`) is unique, `id` is unique, `version`
/// never decreases, `updated_at >= created_at`.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Natural key, unique within the namespace
    pub key: String,
    /// The stored content
    pub content: String,
    /// Memory classification
    pub memory_type: MemoryType,
    /// Coarse partition; second half of the natural key
    pub namespace: String,
    /// Tags, order preserved as written
    pub tags: Vec<String>,
    /// Open-ended metadata mapping
    pub metadata: BTreeMap<String, Value>,
    /// Dense embedding vector, when a collaborator supplied one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Access level tag, opaque to the engine
    pub access_level: AccessLevel,
    /// Creation time (epoch millis)
    pub created_at: i64,
    /// Last mutation time (epoch millis)
    pub updated_at: i64,
    /// Last read time (epoch millis)
    pub last_accessed_at: i64,
    /// Monotonic version, starts at 1 and increments on every update
    pub version: i64,
    /// Number of reads since creation
    pub access_count: i64,
    /// Ids of related entries, order preserved; cycles are permitted
    pub references: Vec<String>,
}

impl Entry {
    /// Build a fresh entry from an input, assigning id and timestamps.
    pub fn from_input(input: EntryInput) -> Result<Self, ValidationError> {
        input.validate()?;
        let now = epoch_millis();
        Ok(Entry {
            id: input
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            key: input.key,
            content: input.content,
            memory_type: input.memory_type,
            namespace: input.namespace,
            tags: input.tags,
            metadata: input.metadata,
            embedding: input.embedding,
            access_level: input.access_level,
            created_at: now,
            updated_at: now,
            last_accessed_at: now,
            version: 1,
            access_count: 0,
            references: input.references,
        })
    }
}

// ============================================================================
// INPUT TYPES
// ============================================================================

/// Input for storing an entry
///
/// Uses `deny_unknown_fields` so malformed callers fail loudly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntryInput {
    /// Caller-chosen id; generated when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Natural key within the namespace
    pub key: String,
    /// Content to store
    pub content: String,
    /// Memory classification
    #[serde(default)]
    pub memory_type: MemoryType,
    /// Namespace partition
    pub namespace: String,
    /// Tags, order preserved
    #[serde(default)]
    pub tags: Vec<String>,
    /// Open-ended metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Embedding vector from the external provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Access level tag
    #[serde(default)]
    pub access_level: AccessLevel,
    /// Related entry ids
    #[serde(default)]
    pub references: Vec<String>,
}

impl EntryInput {
    /// Minimal input with the required fields
    pub fn new(
        namespace: impl Into<String>,
        key: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        EntryInput {
            id: None,
            key: key.into(),
            content: content.into(),
            memory_type: MemoryType::default(),
            namespace: namespace.into(),
            tags: vec![],
            metadata: BTreeMap::new(),
            embedding: None,
            access_level: AccessLevel::default(),
            references: vec![],
        }
    }

    /// Check the key/namespace/content invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.key.is_empty() {
            return Err(ValidationError::EmptyKey);
        }
        let key_chars = self.key.chars().count();
        if key_chars > MAX_KEY_LENGTH {
            return Err(ValidationError::KeyTooLong(key_chars));
        }
        if self.namespace.is_empty() {
            return Err(ValidationError::EmptyNamespace);
        }
        if self.content.is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        Ok(())
    }
}

/// Partial update applied field-wise by `update(id, patch)`
///
/// Absent fields keep their stored value. A successful update always bumps
/// `version` and `updated_at`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_type: Option<MemoryType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_level: Option<AccessLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<String>>,
}

impl EntryPatch {
    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.memory_type.is_none()
            && self.tags.is_none()
            && self.metadata.is_none()
            && self.embedding.is_none()
            && self.access_level.is_none()
            && self.references.is_none()
    }
}

// ============================================================================
// TESTS
// ============================================================================
