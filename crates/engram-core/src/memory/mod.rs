//! Record Types
//!
//! The semantic types persisted by the storage engine:
//! - `Entry` - the primary record, addressable by id and by (namespace, key)
//! - `Session`, `UserPrompt` - interaction windows and their prompts
//! - `Observation` - one captured tool invocation
//! - `SessionSummary` - the structured rollup produced at session end

mod entry;
mod session;

pub use entry::{
    AccessLevel, Entry, EntryInput, EntryPatch, MemoryType, ValidationError, MAX_KEY_LENGTH,
};
pub use session::{
    Observation, ObservationKind, Session, SessionStatus, SessionSummary, UserPrompt,
};

/// Current wall-clock time as integer epoch milliseconds.
///
/// All persisted timestamps use this representation.
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
