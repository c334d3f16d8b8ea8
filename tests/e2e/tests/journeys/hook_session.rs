//! Journey: a full hook session - prompt, four tool uses, session end.

use std::sync::Arc;

use engram_e2e_tests::harness::TestMemory;
use engram_core::{HookEnvelope, HookPipeline, NormalizedHookInput};
use serde_json::{json, Value};

fn event(session: &str, envelope: HookEnvelope) -> NormalizedHookInput {
    let mut envelope = envelope;
    envelope.session_id = Some(session.to_string());
    envelope.cwd = Some("/home/dev/widgets".to_string());
    NormalizedHookInput::from_envelope(envelope)
}

fn tool(session: &str, name: &str, input: Value) -> NormalizedHookInput {
    event(
        session,
        HookEnvelope {
            tool_name: Some(name.to_string()),
            tool_input: Some(input),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn full_session_rolls_up_into_a_summary() {
    let memory = TestMemory::new().await;
    let store = memory.service.store().await.unwrap();
    let pipeline = HookPipeline::new(Arc::clone(&store));

    let prompt = event(
        "sess-1",
        HookEnvelope {
            prompt: Some("wire up the cache".to_string()),
            ..Default::default()
        },
    );
    pipeline.handle_prompt(&prompt).await.unwrap();

    for (name, input) in [
        ("Read", json!({"file_path": "src/cache.rs"})),
        ("Write", json!({"file_path": "src/lib.rs"})),
        ("Bash", json!({"command": "npm test"})),
        ("WebSearch", json!({"query": "lru eviction"})),
    ] {
        pipeline
            .handle_tool_use(&tool("sess-1", name, input))
            .await
            .unwrap();
    }

    let summary = pipeline
        .handle_session_end(&event("sess-1", HookEnvelope::default()))
        .await
        .unwrap()
        .unwrap();

    assert!(summary.completed.starts_with(
        "1 file(s) modified, 1 file(s) read, 1 command(s) executed, 1 search(es)"
    ));
    assert_eq!(summary.files_read, vec!["src/cache.rs"]);
    assert_eq!(summary.files_modified, vec!["src/lib.rs"]);
    assert_eq!(summary.notes, vec!["npm test"]);
    assert_eq!(summary.prompt_number, 1);

    // A later session in the same project sees the history as context.
    let context = pipeline
        .handle_session_start(&event("sess-2", HookEnvelope::default()))
        .await
        .unwrap();
    assert!(context.contains("widgets"));
    assert!(context.contains("wire up the cache"));
}

#[tokio::test]
async fn malformed_envelope_still_produces_a_record() {
    let memory = TestMemory::new().await;
    let store = memory.service.store().await.unwrap();
    let pipeline = HookPipeline::new(store);

    let input = NormalizedHookInput::from_json("definitely { not json");
    // The degraded record has no tool or prompt; handlers are no-ops but
    // must not fail.
    assert!(pipeline.handle_tool_use(&input).await.unwrap().is_none());
    assert!(pipeline.handle_prompt(&input).await.unwrap().is_none());
}
