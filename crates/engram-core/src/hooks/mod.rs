//! Hook Pipeline
//!
//! Observability surface for a running assistant. Host events (tool use,
//! prompt submit, session start/end) arrive as JSON envelopes and are
//! folded into durable observations, prompts, and session summaries.
//!
//! The pipeline never throws at the host: malformed input degrades to a
//! synthesized record and handler errors surface as values.

mod classify;
mod envelope;
mod enrichment;
mod pipeline;
mod summarizer;

pub use classify::{
    extract_file_path, title_for, truncate_chars, truncate_response, INTERNAL_TOOLS,
    RESPONSE_BYTE_CAP, TRUNCATION_MARKER,
};
pub use envelope::{HookEnvelope, HookResponse, HookSpecificOutput, NormalizedHookInput};
pub use enrichment::{Enrichment, EnrichmentOracle, DEFAULT_ORACLE_TIMEOUT};
pub use pipeline::{HookError, HookPipeline};
pub use summarizer::{summarize_session, summary_line};
