//! memory_recall
//!
//! Topic recall bounded by a coarse time range.

use std::sync::Arc;

use engram_core::{memory::epoch_millis, MemoryQuery, MemoryService};
use serde::Deserialize;
use serde_json::{json, Value};

use super::format_entry;

const TIME_RANGES: &[&str] = &["today", "week", "month", "all"];

/// Input schema for memory_recall
pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "topic": {
                "type": "string",
                "description": "What to recall"
            },
            "timeRange": {
                "type": "string",
                "enum": TIME_RANGES,
                "default": "all"
            }
        },
        "required": ["topic"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecallArgs {
    topic: String,
    time_range: Option<String>,
}

fn range_start(range: &str, now: i64) -> Option<i64> {
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    match range {
        "today" => Some(now - DAY_MS),
        "week" => Some(now - 7 * DAY_MS),
        "month" => Some(now - 30 * DAY_MS),
        _ => None,
    }
}

/// Execute memory_recall
pub async fn execute(
    service: &Arc<MemoryService>,
    args: Option<Value>,
) -> Result<Value, String> {
    let args: RecallArgs = serde_json::from_value(args.ok_or("memory_recall requires arguments")?)
        .map_err(|e| format!("Invalid arguments: {e}"))?;

    let range = args.time_range.unwrap_or_else(|| "all".to_string());
    if !TIME_RANGES.contains(&range.as_str()) {
        return Err(format!(
            "Invalid timeRange '{range}'. Must be one of: {}",
            TIME_RANGES.join(", ")
        ));
    }

    let mut query = MemoryQuery::keyword(args.topic.clone());
    query.created_after = range_start(&range, epoch_millis());

    let hits = service.query(&query).await.map_err(|e| e.to_string())?;
    Ok(json!({
        "tool": "memory_recall",
        "topic": args.topic,
        "timeRange": range,
        "count": hits.len(),
        "results": hits.iter().map(format_entry).collect::<Vec<_>>(),
    }))
}
