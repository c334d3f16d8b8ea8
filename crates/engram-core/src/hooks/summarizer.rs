//! Session Summarizer
//!
//! Folds a session's prompts and observations into one structured
//! `SessionSummary` plus a one-line text rendition for the session row.

use std::collections::HashSet;

use serde_json::Value;

use super::classify::truncate_chars;
use crate::memory::{epoch_millis, Observation, ObservationKind, SessionSummary, UserPrompt};

const REQUEST_CHAR_CAP: usize = 500;
const PROMPT_CHAR_CAP: usize = 200;
const FILE_LIST_CAP: usize = 20;
const NOTES_CAP: usize = 5;
const NOTE_CHAR_CAP: usize = 80;

/// Build the structured rollup for a session.
pub fn summarize_session(
    session_id: &str,
    project: &str,
    prompts: &[UserPrompt],
    observations: &[Observation],
) -> SessionSummary {
    let request = render_request(prompts);
    let completed = render_completed(observations);

    let files_read = collect_unique(
        observations
            .iter()
            .flat_map(|obs| obs.files_read.iter().cloned()),
        FILE_LIST_CAP,
    );
    let files_modified = collect_unique(
        observations
            .iter()
            .flat_map(|obs| obs.files_modified.iter().cloned()),
        FILE_LIST_CAP,
    );

    let notes: Vec<String> = observations
        .iter()
        .filter(|obs| obs.tool_name == "Bash")
        .filter_map(|obs| {
            let input: Value = serde_json::from_str(obs.tool_input.as_deref()?).ok()?;
            let command = input.get("command")?.as_str()?;
            Some(truncate_chars(command, NOTE_CHAR_CAP).to_string())
        })
        .take(NOTES_CAP)
        .collect();

    SessionSummary {
        id: 0,
        session_id: session_id.to_string(),
        project: project.to_string(),
        request,
        completed,
        files_read,
        files_modified,
        next_steps: vec![],
        notes,
        prompt_number: prompts.len() as i64,
        created_at: epoch_millis(),
    }
}

/// `[#1] first prompt → [#2] second…`, 200 chars per prompt, 500 total.
fn render_request(prompts: &[UserPrompt]) -> String {
    let joined = prompts
        .iter()
        .map(|p| {
            format!(
                "[#{}] {}",
                p.prompt_number,
                truncate_chars(&p.prompt_text, PROMPT_CHAR_CAP)
            )
        })
        .collect::<Vec<_>>()
        .join(" → ");
    truncate_chars(&joined, REQUEST_CHAR_CAP).to_string()
}

/// Activity counts, omitting zero segments.
fn render_completed(observations: &[Observation]) -> String {
    let mut read = 0usize;
    let mut write = 0usize;
    let mut execute = 0usize;
    let mut search = 0usize;
    for obs in observations {
        match obs.kind {
            ObservationKind::Read => read += 1,
            ObservationKind::Write => write += 1,
            ObservationKind::Execute => execute += 1,
            ObservationKind::Search => search += 1,
            ObservationKind::Other => {}
        }
    }

    let mut parts = Vec::new();
    if write > 0 {
        parts.push(format!("{write} file(s) modified"));
    }
    if read > 0 {
        parts.push(format!("{read} file(s) read"));
    }
    if execute > 0 {
        parts.push(format!("{execute} command(s) executed"));
    }
    if search > 0 {
        parts.push(format!("{search} search(es)"));
    }
    if parts.is_empty() {
        "no tool activity".to_string()
    } else {
        parts.join(", ")
    }
}

fn collect_unique(paths: impl Iterator<Item = String>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for path in paths {
        if out.len() >= cap {
            break;
        }
        if seen.insert(path.clone()) {
            out.push(path);
        }
    }
    out
}

/// One-line text form stored on the session row.
pub fn summary_line(summary: &SessionSummary) -> String {
    if summary.request.is_empty() {
        summary.completed.clone()
    } else {
        format!(
            "{} ({})",
            truncate_chars(&summary.request, 120),
            summary.completed
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prompt(n: i64, text: &str) -> UserPrompt {
        UserPrompt {
            id: n,
            session_id: "sess".to_string(),
            prompt_number: n,
            prompt_text: text.to_string(),
            created_at: n,
        }
    }

    fn observation(tool: &str, kind: ObservationKind, input: Value) -> Observation {
        Observation {
            id: format!("obs-{tool}-{}", input),
            session_id: "sess".to_string(),
            project: "proj".to_string(),
            tool_name: tool.to_string(),
            tool_input: Some(input.to_string()),
            tool_response: None,
            cwd: "/proj".to_string(),
            timestamp: 0,
            kind,
            title: String::new(),
            subtitle: None,
            narrative: None,
            files_read: if kind == ObservationKind::Read {
                super::super::classify::extract_file_path(Some(&input))
                    .into_iter()
                    .collect()
            } else {
                vec![]
            },
            files_modified: if kind == ObservationKind::Write {
                super::super::classify::extract_file_path(Some(&input))
                    .into_iter()
                    .collect()
            } else {
                vec![]
            },
            facts: vec![],
            concepts: vec![],
            prompt_number: Some(1),
        }
    }

    #[test]
    fn test_request_concatenation_and_caps() {
        let prompts = vec![prompt(1, "first"), prompt(2, &"x".repeat(400))];
        let summary = summarize_session("sess", "proj", &prompts, &[]);
        assert!(summary.request.starts_with("[#1] first → [#2] "));
        assert!(summary.request.chars().count() <= 500);
        assert_eq!(summary.prompt_number, 2);
    }

    #[test]
    fn test_completed_counts_in_canonical_order() {
        let observations = vec![
            observation("Read", ObservationKind::Read, json!({"file_path": "a.rs"})),
            observation("Write", ObservationKind::Write, json!({"file_path": "b.rs"})),
            observation("Bash", ObservationKind::Execute, json!({"command": "npm test"})),
            observation("WebSearch", ObservationKind::Search, json!({"query": "q"})),
        ];
        let summary = summarize_session("sess", "proj", &[], &observations);
        assert!(summary.completed.starts_with(
            "1 file(s) modified, 1 file(s) read, 1 command(s) executed, 1 search(es)"
        ));
        assert_eq!(summary.files_read, vec!["a.rs"]);
        assert_eq!(summary.files_modified, vec!["b.rs"]);
        assert_eq!(summary.notes, vec!["npm test"]);
    }

    #[test]
    fn test_zero_segments_omitted() {
        let observations = vec![observation(
            "Read",
            ObservationKind::Read,
            json!({"file_path": "a.rs"}),
        )];
        let summary = summarize_session("sess", "proj", &[], &observations);
        assert_eq!(summary.completed, "1 file(s) read");
    }

    #[test]
    fn test_no_activity() {
        let summary = summarize_session("sess", "proj", &[], &[]);
        assert_eq!(summary.completed, "no tool activity");
        assert!(summary.request.is_empty());
    }

    #[test]
    fn test_file_lists_dedupe_and_cap() {
        let mut observations = Vec::new();
        for i in 0..30 {
            observations.push(observation(
                "Read",
                ObservationKind::Read,
                json!({ "file_path": format!("f{}.rs", i % 25) }),
            ));
        }
        let summary = summarize_session("sess", "proj", &[], &observations);
        assert_eq!(summary.files_read.len(), 20);
        let unique: HashSet<_> = summary.files_read.iter().collect();
        assert_eq!(unique.len(), 20);
    }

    #[test]
    fn test_notes_cap_and_clip() {
        let mut observations = Vec::new();
        for i in 0..8 {
            observations.push(observation(
                "Bash",
                ObservationKind::Execute,
                json!({ "command": format!("{} {}", "c".repeat(100), i) }),
            ));
        }
        let summary = summarize_session("sess", "proj", &[], &observations);
        assert_eq!(summary.notes.len(), 5);
        for note in &summary.notes {
            assert!(note.chars().count() <= 80);
        }
    }

    #[test]
    fn test_summary_line() {
        let mut summary = summarize_session("sess", "proj", &[prompt(1, "do it")], &[]);
        let line = summary_line(&summary);
        assert!(line.contains("[#1] do it"));

        summary.request.clear();
        assert_eq!(summary_line(&summary), summary.completed);
    }
}
