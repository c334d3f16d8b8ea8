//! memory_status
//!
//! Engine statistics and component health. Takes no arguments.

use std::sync::Arc;

use engram_core::MemoryService;
use serde_json::{json, Value};

/// Input schema for memory_status
pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {}
    })
}

/// Execute memory_status
pub async fn execute(
    service: &Arc<MemoryService>,
    _args: Option<Value>,
) -> Result<Value, String> {
    let stats = service.get_stats().await.map_err(|e| e.to_string())?;
    let health = service.health_check().await.map_err(|e| e.to_string())?;

    Ok(json!({
        "tool": "memory_status",
        "healthy": health.healthy,
        "components": health.components,
        "stats": stats,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testutil;
    use engram_core::EntryInput;

    #[tokio::test]
    async fn test_status_reports_counts() {
        let (service, _dir) = testutil::service().await;
        service
            .store_entry(EntryInput::new("ns", "k", "c"))
            .await
            .unwrap();

        let result = execute(&service, None).await.unwrap();
        assert_eq!(result["healthy"], true);
        assert_eq!(result["stats"]["storage"]["totalEntries"], 1);
        assert!(result["components"].as_array().unwrap().len() >= 3);
    }
}
