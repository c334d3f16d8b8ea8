//! memory_list
//!
//! Without a category: namespaces with entry counts. With one: its most
//! recently updated entries.

use std::sync::Arc;

use engram_core::{MemoryQuery, MemoryService, QueryType};
use serde::Deserialize;
use serde_json::{json, Value};

use super::format_entry;

/// Input schema for memory_list
pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "category": {
                "type": "string",
                "description": "Namespace to list; omit to list all namespaces"
            },
            "limit": {
                "type": "integer",
                "description": "Maximum entries when listing a category (default: 20, max: 100)",
                "default": 20,
                "minimum": 1,
                "maximum": 100
            }
        }
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListArgs {
    category: Option<String>,
    limit: Option<i64>,
}

/// Execute memory_list
pub async fn execute(
    service: &Arc<MemoryService>,
    args: Option<Value>,
) -> Result<Value, String> {
    let args: ListArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {e}"))?,
        None => ListArgs::default(),
    };

    match args.category {
        Some(category) => {
            let limit = args.limit.unwrap_or(20).clamp(1, 100) as usize;
            let query = MemoryQuery {
                query_type: QueryType::Hybrid,
                namespace: Some(category.clone()),
                limit,
                ..Default::default()
            };
            let entries = service.query(&query).await.map_err(|e| e.to_string())?;
            Ok(json!({
                "tool": "memory_list",
                "category": category,
                "count": entries.len(),
                "entries": entries.iter().map(format_entry).collect::<Vec<_>>(),
            }))
        }
        None => {
            let namespaces = service
                .list_namespaces()
                .await
                .map_err(|e| e.to_string())?;
            let mut listed = Vec::new();
            for namespace in namespaces {
                let count = service
                    .count(Some(&namespace))
                    .await
                    .map_err(|e| e.to_string())?;
                listed.push(json!({ "namespace": namespace, "count": count }));
            }
            Ok(json!({
                "tool": "memory_list",
                "namespaces": listed,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testutil;
    use engram_core::EntryInput;

    #[tokio::test]
    async fn test_list_namespaces_with_counts() {
        let (service, _dir) = testutil::service().await;
        service
            .store_entry(EntryInput::new("pattern", "a", "1"))
            .await
            .unwrap();
        service
            .store_entry(EntryInput::new("pattern", "b", "2"))
            .await
            .unwrap();
        service
            .store_entry(EntryInput::new("error", "c", "3"))
            .await
            .unwrap();

        let result = execute(&service, None).await.unwrap();
        let namespaces = result["namespaces"].as_array().unwrap();
        assert_eq!(namespaces.len(), 2);
        assert_eq!(namespaces[1]["namespace"], "pattern");
        assert_eq!(namespaces[1]["count"], 2);
    }

    #[tokio::test]
    async fn test_list_one_category() {
        let (service, _dir) = testutil::service().await;
        service
            .store_entry(EntryInput::new("pattern", "a", "1"))
            .await
            .unwrap();
        service
            .store_entry(EntryInput::new("error", "c", "3"))
            .await
            .unwrap();

        let result = execute(&service, Some(json!({ "category": "pattern" })))
            .await
            .unwrap();
        assert_eq!(result["count"], 1);
        assert_eq!(result["entries"][0]["namespace"], "pattern");
    }

    #[tokio::test]
    async fn test_list_empty_store() {
        let (service, _dir) = testutil::service().await;
        let result = execute(&service, None).await.unwrap();
        assert!(result["namespaces"].as_array().unwrap().is_empty());
    }
}
