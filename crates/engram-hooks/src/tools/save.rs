//! memory_save
//!
//! Store one memory entry. The category names the namespace and picks the
//! memory type; importance lands in metadata.

use std::sync::Arc;

use engram_core::{EntryInput, MemoryService, MemoryType};
use serde::Deserialize;
use serde_json::{json, Value};

const CATEGORIES: &[&str] = &["decision", "pattern", "error", "context", "observation"];
const IMPORTANCE: &[&str] = &["low", "medium", "high", "critical"];

/// Input schema for memory_save
pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "content": {
                "type": "string",
                "description": "The memory content to save"
            },
            "category": {
                "type": "string",
                "enum": CATEGORIES,
                "description": "Kind of memory; also names the namespace (default: context)"
            },
            "tags": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Tags attached in order"
            },
            "importance": {
                "type": "string",
                "enum": IMPORTANCE,
                "default": "medium"
            }
        },
        "required": ["content"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveArgs {
    content: String,
    category: Option<String>,
    tags: Option<Vec<String>>,
    importance: Option<String>,
}

fn memory_type_for(category: &str) -> MemoryType {
    match category {
        "pattern" => MemoryType::Procedural,
        "observation" => MemoryType::Episodic,
        _ => MemoryType::Semantic,
    }
}

fn key_for(content: &str) -> String {
    let stem: String = content
        .split_whitespace()
        .take(6)
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .flat_map(char::to_lowercase)
        .take(60)
        .collect();
    let unique = uuid::Uuid::new_v4().simple().to_string();
    let suffix = &unique[..8];
    if stem.is_empty() {
        format!("memory-{suffix}")
    } else {
        format!("{stem}-{suffix}")
    }
}

/// Execute memory_save
pub async fn execute(
    service: &Arc<MemoryService>,
    args: Option<Value>,
) -> Result<Value, String> {
    let args: SaveArgs = serde_json::from_value(args.ok_or("memory_save requires arguments")?)
        .map_err(|e| format!("Invalid arguments: {e}"))?;

    let category = args.category.unwrap_or_else(|| "context".to_string());
    if !CATEGORIES.contains(&category.as_str()) {
        return Err(format!(
            "Invalid category '{category}'. Must be one of: {}",
            CATEGORIES.join(", ")
        ));
    }
    let importance = args.importance.unwrap_or_else(|| "medium".to_string());
    if !IMPORTANCE.contains(&importance.as_str()) {
        return Err(format!(
            "Invalid importance '{importance}'. Must be one of: {}",
            IMPORTANCE.join(", ")
        ));
    }

    let mut input = EntryInput::new(category.clone(), key_for(&args.content), args.content);
    input.memory_type = memory_type_for(&category);
    input.tags = args.tags.unwrap_or_default();
    input
        .metadata
        .insert("importance".to_string(), Value::String(importance));
    input
        .metadata
        .insert("category".to_string(), Value::String(category));

    let entry = service
        .store_entry(input)
        .await
        .map_err(|e| e.to_string())?;

    Ok(json!({
        "tool": "memory_save",
        "id": entry.id,
        "namespace": entry.namespace,
        "key": entry.key,
        "type": entry.memory_type.as_str(),
        "version": entry.version,
    }))
}
