//! Query Descriptors
//!
//! Input types for the storage engine's query compiler and vector search,
//! plus FTS5 query sanitization.

use serde::{Deserialize, Serialize};

use crate::memory::MemoryType;

/// Default result limit when none is given
pub const DEFAULT_QUERY_LIMIT: usize = 10;

/// Retrieval mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// `key = :key`
    Exact,
    /// `key LIKE :keyPrefix || '%'`
    Prefix,
    /// FTS match over content/key/tags, ranked by FTS score
    #[default]
    Keyword,
    /// Vector search; requires `query_embedding`
    Semantic,
    /// Union of keyword matches and filter-only rows, deduped by id
    Hybrid,
}

/// Query descriptor accepted by `MemoryStore::query`
///
/// All modes compose with the optional filters; `limit` defaults to 10.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MemoryQuery {
    /// Retrieval mode
    #[serde(rename = "type", default)]
    pub query_type: QueryType,
    /// Exact key (exact mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Key prefix (prefix mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
    /// Keyword-mode FTS text; substring filter in the other modes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Query vector (semantic mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_embedding: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_type: Option<MemoryType>,
    /// Entries must carry every listed tag
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Epoch millis, exclusive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_before: Option<i64>,
    /// Epoch millis, exclusive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_after: Option<i64>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_QUERY_LIMIT
}

impl Default for MemoryQuery {
    fn default() -> Self {
        Self {
            query_type: QueryType::default(),
            key: None,
            key_prefix: None,
            content: None,
            query_embedding: None,
            namespace: None,
            memory_type: None,
            tags: vec![],
            created_before: None,
            created_after: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

impl MemoryQuery {
    pub fn keyword(text: impl Into<String>) -> Self {
        Self {
            query_type: QueryType::Keyword,
            content: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn exact(key: impl Into<String>) -> Self {
        Self {
            query_type: QueryType::Exact,
            key: Some(key.into()),
            ..Default::default()
        }
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            query_type: QueryType::Prefix,
            key_prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    pub fn semantic(embedding: Vec<f32>) -> Self {
        Self {
            query_type: QueryType::Semantic,
            query_embedding: Some(embedding),
            ..Default::default()
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Options for `MemoryStore::search`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchOptions {
    /// Number of neighbors to return
    pub k: usize,
    /// Drop results whose similarity falls below this
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_type: Option<MemoryType>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            k: DEFAULT_QUERY_LIMIT,
            threshold: None,
            namespace: None,
            memory_type: None,
        }
    }
}

/// One vector search hit with its entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub entry: crate::memory::Entry,
    /// Raw metric distance (smaller = closer)
    pub distance: f32,
    /// Metric-specific similarity used for thresholding
    pub similarity: f32,
}

// ============================================================================
// FTS SANITIZATION
// ============================================================================

/// Quote user text into a safe FTS5 MATCH expression.
///
/// Every whitespace-separated token becomes a quoted phrase (implicit AND),
/// so FTS operators and punctuation in user input cannot break the query.
/// Returns an empty string for all-whitespace input; callers short-circuit
/// that to "no matches".
pub fn sanitize_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|token| format!("\"{}\"", token.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_plain_tokens() {
        assert_eq!(sanitize_fts_query("jwt refresh"), "\"jwt\" \"refresh\"");
    }

    #[test]
    fn test_sanitize_escapes_quotes_and_operators() {
        assert_eq!(sanitize_fts_query("a\"b"), "\"a\"\"b\"");
        assert_eq!(sanitize_fts_query("NOT (x OR y)"), "\"NOT\" \"(x\" \"OR\" \"y)\"");
    }

    #[test]
    fn test_sanitize_empty() {
        assert_eq!(sanitize_fts_query("   "), "");
    }

    #[test]
    fn test_query_defaults() {
        let q = MemoryQuery::default();
        assert_eq!(q.query_type, QueryType::Keyword);
        assert_eq!(q.limit, DEFAULT_QUERY_LIMIT);
    }

    #[test]
    fn test_query_deserializes_type_field() {
        let q: MemoryQuery =
            serde_json::from_str(r#"{"type": "prefix", "keyPrefix": "auth/"}"#).unwrap();
        assert_eq!(q.query_type, QueryType::Prefix);
        assert_eq!(q.key_prefix.as_deref(), Some("auth/"));
        assert_eq!(q.limit, DEFAULT_QUERY_LIMIT);
    }

    #[test]
    fn test_builders() {
        let q = MemoryQuery::keyword("jwt").in_namespace("patterns").with_limit(3);
        assert_eq!(q.content.as_deref(), Some("jwt"));
        assert_eq!(q.namespace.as_deref(), Some("patterns"));
        assert_eq!(q.limit, 3);
    }
}
