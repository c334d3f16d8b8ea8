//! Journey: semantic retrieval over entry embeddings.

use engram_e2e_tests::harness::TestMemory;
use engram_core::{EntryInput, MemoryQuery, SearchOptions};

fn axis(dimensions: usize, index: usize) -> Vec<f32> {
    let mut v = vec![0.0; dimensions];
    v[index] = 1.0;
    v
}

#[tokio::test]
async fn cosine_ordering_over_basis_vectors() {
    let memory = TestMemory::with_dimensions(8).await;
    let service = &memory.service;

    let mut first = EntryInput::new("vectors", "v1", "first basis vector");
    first.embedding = Some(axis(8, 0));
    let first = service.store_entry(first).await.unwrap();

    let mut second = EntryInput::new("vectors", "v2", "second basis vector");
    second.embedding = Some(axis(8, 1));
    let second = service.store_entry(second).await.unwrap();

    let results = service
        .search(&axis(8, 0), &SearchOptions { k: 2, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].entry.id, first.id);
    assert!(results[0].distance.abs() < 1e-5);
    assert_eq!(results[1].entry.id, second.id);
    assert!((results[1].distance - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn semantic_query_mode_matches_search() {
    let memory = TestMemory::with_dimensions(8).await;
    let service = &memory.service;

    let mut embedded = EntryInput::new("vectors", "with", "has an embedding");
    embedded.embedding = Some(axis(8, 2));
    service.store_entry(embedded).await.unwrap();
    service
        .store_entry(EntryInput::new("vectors", "without", "plain entry"))
        .await
        .unwrap();

    let hits = service
        .query(&MemoryQuery::semantic(axis(8, 2)))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].key, "with");
}

#[tokio::test]
async fn deleted_entries_leave_the_index() {
    let memory = TestMemory::with_dimensions(8).await;
    let service = &memory.service;

    let mut input = EntryInput::new("vectors", "gone", "soon deleted");
    input.embedding = Some(axis(8, 3));
    let entry = service.store_entry(input).await.unwrap();

    service.delete(&entry.id).await.unwrap();
    let results = service
        .search(&axis(8, 3), &SearchOptions { k: 5, ..Default::default() })
        .await
        .unwrap();
    assert!(results.is_empty());
}
