//! memory_search
//!
//! Keyword search over content, keys, and tags, optionally scoped to one
//! category namespace.

use std::sync::Arc;

use engram_core::{MemoryQuery, MemoryService};
use serde::Deserialize;
use serde_json::{json, Value};

use super::format_entry;

/// Input schema for memory_search
pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Search text matched against content, keys, and tags"
            },
            "limit": {
                "type": "integer",
                "description": "Maximum results (default: 10, max: 50)",
                "default": 10,
                "minimum": 1,
                "maximum": 50
            },
            "category": {
                "type": "string",
                "description": "Restrict to one category namespace"
            }
        },
        "required": ["query"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    query: String,
    limit: Option<i64>,
    category: Option<String>,
}

/// Execute memory_search
pub async fn execute(
    service: &Arc<MemoryService>,
    args: Option<Value>,
) -> Result<Value, String> {
    let args: SearchArgs = serde_json::from_value(args.ok_or("memory_search requires arguments")?)
        .map_err(|e| format!("Invalid arguments: {e}"))?;

    let limit = args.limit.unwrap_or(10).clamp(1, 50) as usize;
    let mut query = MemoryQuery::keyword(args.query.clone()).with_limit(limit);
    if let Some(category) = args.category {
        query = query.in_namespace(category);
    }

    let hits = service.query(&query).await.map_err(|e| e.to_string())?;
    Ok(json!({
        "tool": "memory_search",
        "query": args.query,
        "count": hits.len(),
        "results": hits.iter().map(format_entry).collect::<Vec<_>>(),
    }))
}
