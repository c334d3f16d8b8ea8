//! Engram Hooks
//!
//! Companion crate to `engram-core`:
//! - the `engram-hooks` binary consumed by the host's hook pipeline
//! - the tool surface (`memory_save`, `memory_search`, ...) an external
//!   RPC layer dispatches into

pub mod tools;
