//! Observation Classification
//!
//! Deterministic title templates, file-path extraction, and the response
//! byte cap. Everything here is a pure fallback the enrichment oracle can
//! improve on but never replace.

use serde_json::Value;

/// Byte cap applied to serialized tool responses.
pub const RESPONSE_BYTE_CAP: usize = 5000;

/// Literal marker appended after truncation.
pub const TRUNCATION_MARKER: &str = "...[truncated]";

/// Tools that never produce observations.
pub const INTERNAL_TOOLS: &[&str] = &[
    "TodoWrite",
    "TodoRead",
    "AskFollowupQuestion",
    "AttemptCompletion",
];

/// Char-boundary-safe truncation to at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn str_field<'a>(input: Option<&'a Value>, keys: &[&str]) -> Option<&'a str> {
    let input = input?;
    keys.iter()
        .find_map(|k| input.get(k).and_then(Value::as_str))
}

/// Extract the file path carried by a tool input, best effort.
pub fn extract_file_path(input: Option<&Value>) -> Option<String> {
    str_field(input, &["file_path", "path"]).map(str::to_string)
}

/// Deterministic title for a tool invocation.
pub fn title_for(tool_name: &str, input: Option<&Value>) -> String {
    match tool_name {
        "Read" => format!("Read {}", str_field(input, &["file_path", "path"]).unwrap_or("file")),
        "Write" => format!(
            "Write {}",
            str_field(input, &["file_path", "path"]).unwrap_or("file")
        ),
        "Edit" | "NotebookEdit" => format!(
            "Edit {}",
            str_field(input, &["file_path", "path", "notebook_path"]).unwrap_or("file")
        ),
        "Bash" => {
            let cmd = str_field(input, &["command"]).unwrap_or("");
            if cmd.chars().count() > 50 {
                format!("Run: {}…", truncate_chars(cmd, 50))
            } else {
                format!("Run: {cmd}")
            }
        }
        "Glob" => format!("Find {}", str_field(input, &["pattern"]).unwrap_or("")),
        "Grep" => format!("Search \"{}\"", str_field(input, &["pattern"]).unwrap_or("")),
        "Task" => format!(
            "Task: {}",
            str_field(input, &["description", "prompt"]).unwrap_or("agent")
        ),
        "WebSearch" => format!("Search: {}", str_field(input, &["query"]).unwrap_or("")),
        "WebFetch" => format!("Fetch: {}", str_field(input, &["url"]).unwrap_or("")),
        other => other.to_string(),
    }
}

/// Serialize and truncate a tool response to the byte cap, appending the
/// truncation marker when anything was dropped.
pub fn truncate_response(response: Option<&Value>) -> Option<String> {
    let response = response?;
    let serialized = match response {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if serialized.len() <= RESPONSE_BYTE_CAP {
        return Some(serialized);
    }

    let mut cut = RESPONSE_BYTE_CAP;
    while cut > 0 && !serialized.is_char_boundary(cut) {
        cut -= 1;
    }
    Some(format!("{}{}", &serialized[..cut], TRUNCATION_MARKER))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_titles_with_inputs() {
        assert_eq!(
            title_for("Read", Some(&json!({"file_path": "src/lib.rs"}))),
            "Read src/lib.rs"
        );
        assert_eq!(
            title_for("Write", Some(&json!({"path": "out.txt"}))),
            "Write out.txt"
        );
        assert_eq!(
            title_for("Edit", Some(&json!({"file_path": "a.rs"}))),
            "Edit a.rs"
        );
        assert_eq!(
            title_for("Bash", Some(&json!({"command": "npm test"}))),
            "Run: npm test"
        );
        assert_eq!(
            title_for("Glob", Some(&json!({"pattern": "**/*.rs"}))),
            "Find **/*.rs"
        );
        assert_eq!(
            title_for("Grep", Some(&json!({"pattern": "TODO"}))),
            "Search \"TODO\""
        );
        assert_eq!(
            title_for("Task", Some(&json!({"description": "explore"}))),
            "Task: explore"
        );
        assert_eq!(
            title_for("WebSearch", Some(&json!({"query": "rust hnsw"}))),
            "Search: rust hnsw"
        );
        assert_eq!(
            title_for("WebFetch", Some(&json!({"url": "https://example.com"}))),
            "Fetch: https://example.com"
        );
    }

    #[test]
    fn test_titles_with_missing_inputs() {
        assert_eq!(title_for("Read", None), "Read file");
        assert_eq!(title_for("Bash", None), "Run: ");
        assert_eq!(title_for("Task", None), "Task: agent");
        assert_eq!(title_for("Grep", None), "Search \"\"");
    }

    #[test]
    fn test_unknown_tool_uses_raw_name() {
        assert_eq!(title_for("MysteryTool", None), "MysteryTool");
        assert_eq!(title_for("LS", Some(&json!({"path": "/tmp"}))), "LS");
    }

    #[test]
    fn test_long_command_clipped() {
        let cmd = "x".repeat(80);
        let title = title_for("Bash", Some(&json!({ "command": cmd })));
        assert_eq!(title, format!("Run: {}…", "x".repeat(50)));
    }

    #[test]
    fn test_extract_file_path() {
        assert_eq!(
            extract_file_path(Some(&json!({"file_path": "a.rs"}))),
            Some("a.rs".to_string())
        );
        assert_eq!(
            extract_file_path(Some(&json!({"path": "b.rs"}))),
            Some("b.rs".to_string())
        );
        assert_eq!(extract_file_path(Some(&json!({"other": 1}))), None);
        assert_eq!(extract_file_path(None), None);
    }

    #[test]
    fn test_truncate_chars_is_boundary_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("日本語のテスト", 3), "日本語");
    }

    #[test]
    fn test_response_below_cap_untouched() {
        let out = truncate_response(Some(&json!({"ok": true}))).unwrap();
        assert_eq!(out, "{\"ok\":true}");
        assert!(!out.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn test_response_above_cap_is_truncated() {
        let big = "a".repeat(RESPONSE_BYTE_CAP * 2);
        let out = truncate_response(Some(&Value::String(big))).unwrap();
        assert!(out.len() <= RESPONSE_BYTE_CAP + TRUNCATION_MARKER.len());
        assert!(out.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_response_truncation_respects_char_boundaries() {
        let big = "語".repeat(RESPONSE_BYTE_CAP);
        let out = truncate_response(Some(&Value::String(big))).unwrap();
        assert!(out.ends_with(TRUNCATION_MARKER));
        // No panic means the cut landed on a boundary; verify re-parse.
        assert!(out.chars().count() > 0);
    }
}
