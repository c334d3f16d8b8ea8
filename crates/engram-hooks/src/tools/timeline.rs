//! memory_timeline
//!
//! Browse entries created around an anchor entry, within a window given
//! in minutes before and after the anchor's creation time.

use std::sync::Arc;

use engram_core::{MemoryQuery, MemoryService, QueryType};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{format_entry, format_millis};

const DEFAULT_WINDOW_MINUTES: i64 = 30;
const TIMELINE_LIMIT: usize = 50;

/// Input schema for memory_timeline
pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "anchorId": {
                "type": "string",
                "description": "Id of the entry to center the window on"
            },
            "before": {
                "type": "integer",
                "description": "Minutes before the anchor (default: 30)",
                "default": DEFAULT_WINDOW_MINUTES,
                "minimum": 0
            },
            "after": {
                "type": "integer",
                "description": "Minutes after the anchor (default: 30)",
                "default": DEFAULT_WINDOW_MINUTES,
                "minimum": 0
            }
        },
        "required": ["anchorId"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimelineArgs {
    anchor_id: String,
    before: Option<i64>,
    after: Option<i64>,
}

/// Execute memory_timeline
pub async fn execute(
    service: &Arc<MemoryService>,
    args: Option<Value>,
) -> Result<Value, String> {
    let args: TimelineArgs =
        serde_json::from_value(args.ok_or("memory_timeline requires arguments")?)
            .map_err(|e| format!("Invalid arguments: {e}"))?;

    let anchor = service
        .get(&args.anchor_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("anchor entry not found: {}", args.anchor_id))?;

    let before_ms = args.before.unwrap_or(DEFAULT_WINDOW_MINUTES).max(0) * 60_000;
    let after_ms = args.after.unwrap_or(DEFAULT_WINDOW_MINUTES).max(0) * 60_000;

    let query = MemoryQuery {
        query_type: QueryType::Hybrid,
        created_after: Some(anchor.created_at - before_ms - 1),
        created_before: Some(anchor.created_at + after_ms + 1),
        limit: TIMELINE_LIMIT,
        ..Default::default()
    };
    let mut entries = service.query(&query).await.map_err(|e| e.to_string())?;
    entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    Ok(json!({
        "tool": "memory_timeline",
        "anchor": {
            "id": anchor.id,
            "createdAt": format_millis(anchor.created_at),
        },
        "window": { "beforeMinutes": before_ms / 60_000, "afterMinutes": after_ms / 60_000 },
        "count": entries.len(),
        "entries": entries.iter().map(format_entry).collect::<Vec<_>>(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testutil;
    use engram_core::EntryInput;

    #[tokio::test]
    async fn test_timeline_includes_neighbors() {
        let (service, _dir) = testutil::service().await;
        let anchor = service
            .store_entry(EntryInput::new("ns", "anchor", "anchor entry"))
            .await
            .unwrap();
        service
            .store_entry(EntryInput::new("ns", "nearby", "created right after"))
            .await
            .unwrap();

        let result = execute(&service, Some(json!({ "anchorId": anchor.id })))
            .await
            .unwrap();
        assert_eq!(result["count"], 2);
        assert_eq!(result["anchor"]["id"], anchor.id);
    }

    #[tokio::test]
    async fn test_timeline_unknown_anchor() {
        let (service, _dir) = testutil::service().await;
        let err = execute(&service, Some(json!({ "anchorId": "missing" })))
            .await
            .unwrap_err();
        assert!(err.contains("anchor entry not found"));
    }

    #[tokio::test]
    async fn test_timeline_requires_args() {
        let (service, _dir) = testutil::service().await;
        assert!(execute(&service, None).await.is_err());
        assert!(execute(&service, Some(json!({}))).await.is_err());
    }

    #[tokio::test]
    async fn test_timeline_zero_window_still_includes_anchor() {
        let (service, _dir) = testutil::service().await;
        let anchor = service
            .store_entry(EntryInput::new("ns", "only", "by itself"))
            .await
            .unwrap();

        let result = execute(
            &service,
            Some(json!({ "anchorId": anchor.id, "before": 0, "after": 0 })),
        )
        .await
        .unwrap();
        assert_eq!(result["count"], 1);
    }
}
