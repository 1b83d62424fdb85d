//! Error types for the queue routing service
//!
//! The engine reports failures through the closed `QueueError` enum so
//! callers can match on failure identity; application-level code (config
//! loading, export, CLI) uses anyhow for context-rich propagation.

/// Result type alias for application-level code
pub type Result<T> = anyhow::Result<T>;

/// Errors surfaced by the routing engine and its collaborators
///
/// Engine operations never panic and never leave partial mutation behind:
/// an operation that returns an error has not changed queue state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueueError {
    #[error("line {line} is outside 1..={lines}")]
    InvalidLine { line: usize, lines: usize },

    #[error("no line has free capacity")]
    NoCapacity,

    #[error("line {line} has nobody to serve")]
    EmptyLine { line: usize },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("sync to {path} failed: {message}")]
    SyncFailed { path: String, message: String },
}
