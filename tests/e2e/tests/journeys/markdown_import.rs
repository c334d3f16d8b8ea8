//! Journey: Markdown directory migration, plus trigram CJK retrieval.

use engram_e2e_tests::harness::TestMemory;
use engram_core::{import_markdown_dir, EntryInput, MemoryQuery};
use tempfile::TempDir;

#[tokio::test]
async fn sections_become_entries_referencing_their_parent() {
    let memory = TestMemory::new().await;
    let store = memory.service.store().await.unwrap();

    let docs = TempDir::new().unwrap();
    let body = "details ".repeat(30);
    std::fs::write(
        docs.path().join("architecture.md"),
        format!("# Architecture\n\n## Storage\n{body}\n\n## Cache\n{body}\n"),
    )
    .unwrap();

    let report = import_markdown_dir(&store, docs.path(), "notes").unwrap();
    assert_eq!(report.files, 1);
    assert_eq!(report.entries, 3);
    assert!(report.failures.is_empty());

    let parent = store.get_by_key("notes", "architecture").unwrap().unwrap();
    for section in ["architecture/storage", "architecture/cache"] {
        let entry = store.get_by_key("notes", section).unwrap().unwrap();
        assert_eq!(entry.references, vec![parent.id.clone()]);
    }
}

#[tokio::test]
async fn trigram_tokenizer_retrieves_japanese() {
    let memory = TestMemory::cjk().await;
    let service = &memory.service;

    service
        .store_entry(EntryInput::new(
            "japanese",
            "doc",
            "日本語のテスト内容です。",
        ))
        .await
        .unwrap();

    let hits = service
        .query(&MemoryQuery::keyword("テスト内容").in_namespace("japanese"))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].key, "doc");
}
