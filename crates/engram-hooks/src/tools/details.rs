//! memory_details
//!
//! Fetch full entries by id; at most five per request.

use std::sync::Arc;

use engram_core::MemoryService;
use serde::Deserialize;
use serde_json::{json, Value};

use super::format_millis;

const MAX_IDS: usize = 5;

/// Input schema for memory_details
pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "ids": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Entry ids to fetch (at most 5)",
                "minItems": 1,
                "maxItems": MAX_IDS
            }
        },
        "required": ["ids"]
    })
}

#[derive(Debug, Deserialize)]
struct DetailsArgs {
    ids: Vec<String>,
}

/// Execute memory_details
pub async fn execute(
    service: &Arc<MemoryService>,
    args: Option<Value>,
) -> Result<Value, String> {
    let args: DetailsArgs =
        serde_json::from_value(args.ok_or("memory_details requires arguments")?)
            .map_err(|e| format!("Invalid arguments: {e}"))?;

    if args.ids.is_empty() {
        return Err("ids must not be empty".to_string());
    }
    if args.ids.len() > MAX_IDS {
        return Err(format!(
            "at most {MAX_IDS} ids per request (got {})",
            args.ids.len()
        ));
    }

    let mut entries = Vec::new();
    let mut missing = Vec::new();
    for id in &args.ids {
        match service.get(id).await.map_err(|e| e.to_string())? {
            Some(entry) => entries.push(json!({
                "id": entry.id,
                "namespace": entry.namespace,
                "key": entry.key,
                "type": entry.memory_type.as_str(),
                "content": entry.content,
                "tags": entry.tags,
                "metadata": entry.metadata,
                "references": entry.references,
                "accessLevel": entry.access_level.as_str(),
                "createdAt": format_millis(entry.created_at),
                "updatedAt": format_millis(entry.updated_at),
                "version": entry.version,
                "accessCount": entry.access_count,
            })),
            None => missing.push(id.clone()),
        }
    }

    Ok(json!({
        "tool": "memory_details",
        "entries": entries,
        "missing": missing,
    }))
}
