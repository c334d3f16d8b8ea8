//! Memory Tools
//!
//! The seven operations exposed to an external RPC layer. Each module
//! carries its input `schema()` and an `execute()` over the shared
//! `MemoryService`; the transport itself lives outside this crate.

pub mod details;
pub mod list;
pub mod recall;
pub mod save;
pub mod search;
pub mod status;
pub mod timeline;

use std::sync::Arc;

use engram_core::{Entry, MemoryService};
use serde_json::{json, Value};

/// Tool definitions in declaration order.
pub fn definitions() -> Vec<Value> {
    vec![
        json!({ "name": "memory_save", "description": "Save a memory entry", "inputSchema": save::schema() }),
        json!({ "name": "memory_search", "description": "Keyword search over memories", "inputSchema": search::schema() }),
        json!({ "name": "memory_timeline", "description": "Browse memories around an anchor entry", "inputSchema": timeline::schema() }),
        json!({ "name": "memory_details", "description": "Fetch full entries by id", "inputSchema": details::schema() }),
        json!({ "name": "memory_recall", "description": "Recall memories about a topic in a time range", "inputSchema": recall::schema() }),
        json!({ "name": "memory_list", "description": "List namespaces or the entries of one", "inputSchema": list::schema() }),
        json!({ "name": "memory_status", "description": "Engine statistics and health", "inputSchema": status::schema() }),
    ]
}

/// Dispatch a named tool call.
pub async fn dispatch(
    service: &Arc<MemoryService>,
    name: &str,
    args: Option<Value>,
) -> Result<Value, String> {
    match name {
        "memory_save" => save::execute(service, args).await,
        "memory_search" => search::execute(service, args).await,
        "memory_timeline" => timeline::execute(service, args).await,
        "memory_details" => details::execute(service, args).await,
        "memory_recall" => recall::execute(service, args).await,
        "memory_list" => list::execute(service, args).await,
        "memory_status" => status::execute(service, args).await,
        other => Err(format!("unknown tool: {other}")),
    }
}

/// Compact wire form of an entry shared by the read-side tools.
pub(crate) fn format_entry(entry: &Entry) -> Value {
    let content: String = entry.content.chars().take(200).collect();
    json!({
        "id": entry.id,
        "namespace": entry.namespace,
        "key": entry.key,
        "type": entry.memory_type.as_str(),
        "content": content,
        "tags": entry.tags,
        "createdAt": format_millis(entry.created_at),
        "updatedAt": format_millis(entry.updated_at),
        "version": entry.version,
    })
}

pub(crate) fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use engram_core::MemoryConfig;
    use tempfile::TempDir;

    pub async fn service() -> (Arc<MemoryService>, TempDir) {
        let dir = TempDir::new().unwrap();
        let service = MemoryService::new(MemoryConfig::for_project(dir.path()));
        service.initialize().await.unwrap();
        (Arc::new(service), dir)
    }
}
