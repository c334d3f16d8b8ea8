//! Journey: store, query, update, delete.

use engram_e2e_tests::harness::TestMemory;
use engram_core::{EntryInput, EntryPatch, MemoryQuery};

#[tokio::test]
async fn store_query_update_delete() {
    let memory = TestMemory::new().await;
    let service = &memory.service;

    let mut input = EntryInput::new("patterns", "auth", "JWT + refresh");
    input.tags = vec!["auth".to_string()];
    let entry = service.store_entry(input).await.unwrap();
    assert_eq!(entry.version, 1);

    let hits = service
        .query(&MemoryQuery::keyword("JWT").in_namespace("patterns"))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, entry.id);

    let updated = service
        .update(
            &entry.id,
            EntryPatch {
                content: Some("JWT only".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.version, 2);

    assert!(service.delete(&entry.id).await.unwrap());
    assert_eq!(service.count(Some("patterns")).await.unwrap(), 0);
}

#[tokio::test]
async fn conflicting_keys_are_rejected_across_the_facade() {
    let memory = TestMemory::new().await;
    let service = &memory.service;

    service
        .store_entry(EntryInput::new("ns", "taken", "first"))
        .await
        .unwrap();
    let err = service
        .store_entry(EntryInput::new("ns", "taken", "second"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("conflict"));
}

#[tokio::test]
async fn updated_content_is_searchable() {
    let memory = TestMemory::new().await;
    let service = &memory.service;

    let entry = service
        .store_entry(EntryInput::new("ns", "k", "about caching"))
        .await
        .unwrap();
    service
        .update(
            &entry.id,
            EntryPatch {
                content: Some("about retrieval".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(service
        .query(&MemoryQuery::keyword("caching"))
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        service
            .query(&MemoryQuery::keyword("retrieval"))
            .await
            .unwrap()
            .len(),
        1
    );
}
