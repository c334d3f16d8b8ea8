//! Journey: the seven memory tools over one shared service.

use engram_e2e_tests::harness::TestMemory;
use engram_hooks::tools;
use serde_json::json;

#[tokio::test]
async fn save_then_find_through_every_read_tool() {
    let memory = TestMemory::new().await;
    let service = &memory.service;

    let saved = tools::dispatch(
        service,
        "memory_save",
        Some(json!({
            "content": "Decided to use SQLite with WAL for persistence",
            "category": "decision",
            "tags": ["storage"],
            "importance": "high"
        })),
    )
    .await
    .unwrap();
    let id = saved["id"].as_str().unwrap().to_string();

    let searched = tools::dispatch(
        service,
        "memory_search",
        Some(json!({ "query": "SQLite", "category": "decision" })),
    )
    .await
    .unwrap();
    assert_eq!(searched["count"], 1);

    let recalled = tools::dispatch(
        service,
        "memory_recall",
        Some(json!({ "topic": "persistence", "timeRange": "today" })),
    )
    .await
    .unwrap();
    assert_eq!(recalled["count"], 1);

    let details = tools::dispatch(service, "memory_details", Some(json!({ "ids": [id.clone()] })))
        .await
        .unwrap();
    assert_eq!(details["entries"][0]["id"], id.as_str());

    let timeline = tools::dispatch(
        service,
        "memory_timeline",
        Some(json!({ "anchorId": id })),
    )
    .await
    .unwrap();
    assert_eq!(timeline["count"], 1);

    let listed = tools::dispatch(service, "memory_list", None).await.unwrap();
    assert_eq!(listed["namespaces"][0]["namespace"], "decision");

    let status = tools::dispatch(service, "memory_status", None).await.unwrap();
    assert_eq!(status["healthy"], true);
    assert_eq!(status["stats"]["storage"]["totalEntries"], 1);
}
