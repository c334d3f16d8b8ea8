//! Hook Envelope Normalization
//!
//! The host sends one JSON object per invocation. Parsing is forgiving:
//! malformed JSON degrades to a synthesized record carrying only session
//! id, cwd, project, and timestamp, so the pipeline never throws.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::memory::epoch_millis;

/// Raw envelope as received from the host (snake_case wire format).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookEnvelope {
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub prompt: Option<String>,
    pub tool_name: Option<String>,
    pub tool_input: Option<Value>,
    pub tool_result: Option<Value>,
    pub transcript_path: Option<String>,
    pub stop_reason: Option<String>,
}

/// Normalized hook input consumed by the pipeline handlers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedHookInput {
    pub session_id: String,
    pub cwd: String,
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    pub timestamp: i64,
}

impl NormalizedHookInput {
    /// Parse a serialized envelope, degrading gracefully on bad input.
    pub fn from_json(raw: &str) -> Self {
        let envelope: HookEnvelope = serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "malformed hook envelope; synthesizing record");
            HookEnvelope::default()
        });
        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: HookEnvelope) -> Self {
        let session_id = envelope
            .session_id
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("session-{}", Uuid::new_v4()));
        let cwd = envelope
            .cwd
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                std::env::current_dir()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            });
        let project = project_from_cwd(&cwd);

        Self {
            session_id,
            cwd,
            project,
            prompt: envelope.prompt,
            tool_name: envelope.tool_name,
            tool_input: envelope.tool_input,
            tool_response: envelope.tool_result,
            transcript_path: envelope.transcript_path,
            stop_reason: envelope.stop_reason,
            timestamp: epoch_millis(),
        }
    }
}

/// Last path segment of `cwd`; "unknown" when the path is empty or ends
/// with a separator.
pub(crate) fn project_from_cwd(cwd: &str) -> String {
    if cwd.is_empty() || cwd.ends_with('/') || cwd.ends_with('\\') {
        return "unknown".to_string();
    }
    cwd.rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

// ============================================================================
// RESPONSE ENVELOPE
// ============================================================================

/// Payload nested under `hookSpecificOutput`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: String,
    pub additional_context: String,
}

/// Response envelope written to stdout. `continue` is always true: hook
/// failures must never block the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HookResponse {
    #[serde(rename = "continue")]
    pub continue_: bool,
    pub suppress_output: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

impl HookResponse {
    /// Silent success.
    pub fn ok() -> Self {
        Self {
            continue_: true,
            suppress_output: true,
            hook_specific_output: None,
        }
    }

    /// Success carrying context back to the host.
    pub fn with_context(event_name: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            continue_: true,
            suppress_output: false,
            hook_specific_output: Some(HookSpecificOutput {
                hook_event_name: event_name.into(),
                additional_context: context.into(),
            }),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
