//! Hook Pipeline Handlers
//!
//! The four host events and the standalone re-enrichment path. Handlers
//! return values; the binary layer turns them into response envelopes and
//! never lets an error block the host.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::classify::{extract_file_path, title_for, truncate_response, INTERNAL_TOOLS};
use super::enrichment::{Enrichment, EnrichmentOracle, DEFAULT_ORACLE_TIMEOUT};
use super::envelope::NormalizedHookInput;
use super::summarizer::{summarize_session, summary_line};
use crate::memory::{Observation, ObservationKind, SessionStatus, SessionSummary, UserPrompt};
use crate::storage::{MemoryStore, StorageError};

/// Hook pipeline error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// Storage failure while persisting a record
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Hook pipeline result type
pub type Result<T> = std::result::Result<T, HookError>;

/// Bounded ingestion path from host events to durable records.
pub struct HookPipeline {
    store: Arc<MemoryStore>,
    oracle: Option<Arc<dyn EnrichmentOracle>>,
    oracle_timeout: Duration,
}

impl HookPipeline {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            oracle: None,
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }

    /// Attach an enrichment oracle.
    pub fn with_oracle(mut self, oracle: Arc<dyn EnrichmentOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Override the oracle timeout (default 15 s).
    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    // ========================================================================
    // SESSION START
    // ========================================================================

    /// Load recent project context and render it as Markdown. Returns the
    /// empty string when the project has no history.
    pub async fn handle_session_start(&self, input: &NormalizedHookInput) -> Result<String> {
        let project = &input.project;
        let sessions = self.store.recent_sessions(Some(project), 5)?;
        let prompts = self.store.recent_prompts(project, 5)?;
        let summaries = self.store.summaries_for_project(project, 3)?;
        let observations = self.store.recent_observations(project, 10)?;

        if sessions.is_empty() && prompts.is_empty() && summaries.is_empty() && observations.is_empty()
        {
            return Ok(String::new());
        }

        let mut out = format!("# Memory context: {project}\n");

        if !summaries.is_empty() {
            out.push_str("\n## Previous session summaries\n");
            for summary in &summaries {
                out.push_str(&format!(
                    "- {} — {}\n",
                    format_millis(summary.created_at),
                    if summary.request.is_empty() {
                        summary.completed.clone()
                    } else {
                        format!("{} ({})", summary.request, summary.completed)
                    }
                ));
            }
        }

        if !sessions.is_empty() {
            out.push_str("\n## Recent sessions\n");
            for session in &sessions {
                out.push_str(&format!(
                    "- {} [{}] {} observation(s){}\n",
                    format_millis(session.started_at),
                    session.status.as_str(),
                    session.observation_count,
                    session
                        .summary
                        .as_deref()
                        .map(|s| format!(" — {s}"))
                        .unwrap_or_default()
                ));
            }
        }

        if !prompts.is_empty() {
            out.push_str("\n## Recent prompts\n");
            for prompt in &prompts {
                out.push_str(&format!("- {}\n", prompt.prompt_text));
            }
        }

        if !observations.is_empty() {
            out.push_str("\n## Recent activity\n");
            for obs in &observations {
                out.push_str(&format!("- {}\n", obs.title));
            }
        }

        Ok(out)
    }

    // ========================================================================
    // PROMPT SUBMIT
    // ========================================================================

    /// Ensure the session exists and append the prompt with the next dense
    /// number. Returns `None` when the envelope carried no prompt.
    pub async fn handle_prompt(&self, input: &NormalizedHookInput) -> Result<Option<UserPrompt>> {
        self.store.ensure_session(
            &input.session_id,
            &input.project,
            input.prompt.as_deref(),
        )?;
        let Some(prompt) = input.prompt.as_deref() else {
            return Ok(None);
        };
        let stored = self.store.append_prompt(&input.session_id, prompt)?;
        Ok(Some(stored))
    }

    // ========================================================================
    // TOOL USE
    // ========================================================================

    /// Capture one tool invocation as an observation. Internal tools and
    /// envelopes without a tool name are skipped.
    pub async fn handle_tool_use(&self, input: &NormalizedHookInput) -> Result<Option<Observation>> {
        let Some(tool_name) = input.tool_name.as_deref() else {
            return Ok(None);
        };
        if INTERNAL_TOOLS.contains(&tool_name) {
            return Ok(None);
        }

        self.store
            .ensure_session(&input.session_id, &input.project, None)?;

        let kind = ObservationKind::for_tool(tool_name);
        let file_path = extract_file_path(input.tool_input.as_ref());
        let prompt_count = self.store.prompt_count(&input.session_id)?;

        let mut observation = Observation {
            id: Uuid::new_v4().to_string(),
            session_id: input.session_id.clone(),
            project: input.project.clone(),
            tool_name: tool_name.to_string(),
            tool_input: input.tool_input.as_ref().map(|v| v.to_string()),
            tool_response: truncate_response(input.tool_response.as_ref()),
            cwd: input.cwd.clone(),
            timestamp: input.timestamp,
            kind,
            title: title_for(tool_name, input.tool_input.as_ref()),
            subtitle: None,
            narrative: None,
            files_read: match kind {
                ObservationKind::Read => file_path.clone().into_iter().collect(),
                _ => vec![],
            },
            files_modified: match kind {
                ObservationKind::Write => file_path.into_iter().collect(),
                _ => vec![],
            },
            facts: vec![],
            concepts: vec![],
            prompt_number: (prompt_count > 0).then_some(prompt_count),
        };

        if let Some(enrichment) = self
            .consult_oracle(tool_name, input.tool_input.as_ref(), input.tool_response.as_ref())
            .await
        {
            apply_enrichment(&mut observation, enrichment);
        }

        self.store.insert_observation(&observation)?;
        Ok(Some(observation))
    }

    /// Ask the oracle, bounded by the timeout. Refusals and timeouts fall
    /// back to the deterministic templates.
    async fn consult_oracle(
        &self,
        tool_name: &str,
        tool_input: Option<&serde_json::Value>,
        tool_response: Option<&serde_json::Value>,
    ) -> Option<Enrichment> {
        let oracle = self.oracle.as_ref()?;
        match tokio::time::timeout(
            self.oracle_timeout,
            oracle.enrich(tool_name, tool_input, tool_response),
        )
        .await
        {
            Ok(Some(enrichment)) => Some(enrichment.clamped()),
            Ok(None) => None,
            Err(_) => {
                tracing::warn!(tool_name, "enrichment oracle timed out; using templates");
                None
            }
        }
    }

    // ========================================================================
    // SESSION END
    // ========================================================================

    /// Fold the session into a summary and mark it completed. Returns
    /// `None` for sessions this store never saw.
    pub async fn handle_session_end(
        &self,
        input: &NormalizedHookInput,
    ) -> Result<Option<SessionSummary>> {
        let Some(session) = self.store.get_session(&input.session_id)? else {
            return Ok(None);
        };

        let prompts = self.store.prompts_for_session(&session.session_id)?;
        let observations = self.store.observations_for_session(&session.session_id)?;
        let summary = summarize_session(
            &session.session_id,
            &session.project,
            &prompts,
            &observations,
        );
        let stored = self.store.insert_summary(&summary)?;
        self.store.finish_session(
            &session.session_id,
            Some(&summary_line(&stored)),
            SessionStatus::Completed,
        )?;
        Ok(Some(stored))
    }

    // ========================================================================
    // RE-ENRICHMENT
    // ========================================================================

    /// Re-run the oracle for a stored observation (`enrich` subcommand).
    /// Returns whether the observation was updated.
    pub async fn enrich_observation(&self, observation_id: &str) -> Result<bool> {
        let Some(observation) = self.store.get_observation(observation_id)? else {
            return Ok(false);
        };
        let tool_input: Option<serde_json::Value> = observation
            .tool_input
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok());
        let tool_response: Option<serde_json::Value> = observation
            .tool_response
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok());

        let Some(enrichment) = self
            .consult_oracle(
                &observation.tool_name,
                tool_input.as_ref(),
                tool_response.as_ref(),
            )
            .await
        else {
            return Ok(false);
        };

        let enrichment = enrichment.clamped();
        self.store.update_observation_enrichment(
            observation_id,
            enrichment.subtitle.as_deref(),
            enrichment.narrative.as_deref(),
            &enrichment.facts,
            &enrichment.concepts,
        )?;
        Ok(true)
    }
}

fn apply_enrichment(observation: &mut Observation, enrichment: Enrichment) {
    observation.subtitle = enrichment.subtitle;
    observation.narrative = enrichment.narrative;
    observation.facts = enrichment.facts;
    observation.concepts = enrichment.concepts;
}

fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

// ============================================================================
// TESTS
// ============================================================================
