//! Sessions, prompts, observations, summaries
//!
//! One `Session` groups the prompts and tool observations of a single
//! interaction window and owns at most one rollup `SessionSummary`.

use serde::{Deserialize, Serialize};

// ============================================================================
// SESSION
// ============================================================================

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    pub fn parse_name(s: &str) -> Self {
        match s {
            "completed" => SessionStatus::Completed,
            "abandoned" => SessionStatus::Abandoned,
            _ => SessionStatus::Active,
        }
    }
}

/// A logical interaction window
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Row id
    pub id: i64,
    /// Opaque session identifier from the host; unique
    pub session_id: String,
    /// Project the session belongs to
    pub project: String,
    /// Initial prompt, when one was seen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Start time (epoch millis)
    pub started_at: i64,
    /// End time (epoch millis), absent while active
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<i64>,
    /// Number of observations attached so far
    pub observation_count: i64,
    /// One-line text rendition of the summary, set at session end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Lifecycle state
    pub status: SessionStatus,
}

/// One user prompt within a session
///
/// (`session_id`, `prompt_number`) is unique; numbers are dense from 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPrompt {
    pub id: i64,
    pub session_id: String,
    pub prompt_number: i64,
    pub prompt_text: String,
    pub created_at: i64,
}

// ============================================================================
// OBSERVATIONS
// ============================================================================

/// Classification of a captured tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ObservationKind {
    Read,
    Write,
    Execute,
    Search,
    #[default]
    Other,
}

impl ObservationKind {
    /// Derive the kind from a tool name.
    ///
    /// Unlisted tools map to `Other`.
    pub fn for_tool(tool_name: &str) -> Self {
        match tool_name {
            "Read" | "Glob" | "Grep" | "LS" => ObservationKind::Read,
            "Write" | "Edit" | "NotebookEdit" => ObservationKind::Write,
            "Bash" | "Task" | "Skill" => ObservationKind::Execute,
            "WebSearch" | "WebFetch" => ObservationKind::Search,
            _ => ObservationKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationKind::Read => "read",
            ObservationKind::Write => "write",
            ObservationKind::Execute => "execute",
            ObservationKind::Search => "search",
            ObservationKind::Other => "other",
        }
    }

    pub fn parse_name(s: &str) -> Self {
        match s {
            "read" => ObservationKind::Read,
            "write" => ObservationKind::Write,
            "execute" => ObservationKind::Execute,
            "search" => ObservationKind::Search,
            _ => ObservationKind::Other,
        }
    }
}

impl std::fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A captured tool invocation
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// Unique identifier (UUID v4)
    pub id: String,
    pub session_id: String,
    pub project: String,
    pub tool_name: String,
    /// Serialized tool input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<String>,
    /// Serialized tool response, truncated to the byte cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_response: Option<String>,
    pub cwd: String,
    /// Capture time (epoch millis)
    pub timestamp: i64,
    /// Derived classification
    pub kind: ObservationKind,
    /// Deterministic or oracle-provided title
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    pub files_read: Vec<String>,
    pub files_modified: Vec<String>,
    pub facts: Vec<String>,
    pub concepts: Vec<String>,
    /// Containing prompt, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_number: Option<i64>,
}

// ============================================================================
// SESSION SUMMARY
// ============================================================================

/// Structured rollup of one session
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: i64,
    pub session_id: String,
    pub project: String,
    /// Concatenation of all prompts in order, truncated
    pub request: String,
    /// Activity counts, e.g. "3 file(s) modified, 5 file(s) read"
    pub completed: String,
    pub files_read: Vec<String>,
    pub files_modified: Vec<String>,
    pub next_steps: Vec<String>,
    pub notes: Vec<String>,
    /// Count of prompts folded into `request`
    pub prompt_number: i64,
    pub created_at: i64,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_kind_mapping() {
        for tool in ["Read", "Glob", "Grep", "LS"] {
            assert_eq!(ObservationKind::for_tool(tool), ObservationKind::Read);
        }
        for tool in ["Write", "Edit", "NotebookEdit"] {
            assert_eq!(ObservationKind::for_tool(tool), ObservationKind::Write);
        }
        for tool in ["Bash", "Task", "Skill"] {
            assert_eq!(ObservationKind::for_tool(tool), ObservationKind::Execute);
        }
        for tool in ["WebSearch", "WebFetch"] {
            assert_eq!(ObservationKind::for_tool(tool), ObservationKind::Search);
        }
        assert_eq!(
            ObservationKind::for_tool("SomethingElse"),
            ObservationKind::Other
        );
    }

    #[test]
    fn test_observation_kind_roundtrip() {
        for kind in [
            ObservationKind::Read,
            ObservationKind::Write,
            ObservationKind::Execute,
            ObservationKind::Search,
            ObservationKind::Other,
        ] {
            assert_eq!(ObservationKind::parse_name(kind.as_str()), kind);
        }
    }

    #[test]
    fn test_session_status_roundtrip() {
        for status in [
            SessionStatus::Active,
            SessionStatus::Completed,
            SessionStatus::Abandoned,
        ] {
            assert_eq!(SessionStatus::parse_name(status.as_str()), status);
        }
    }
}
