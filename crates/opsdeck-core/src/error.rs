use std::time::Duration;

use thiserror::Error;

/// Rejected before any network call; never mutates state.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("please enter a query")]
    EmptyInput,
    #[error("please select at least one tool before submitting")]
    NoToolsSelected,
}

/// Network failure or non-success response from the backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server error: {status}")]
    Status { status: u16, body: String },
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("invalid response: {0}")]
    Decode(String),
}

/// Index-based lookup against a history snapshot that no longer has it.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("no history entry at index {index} (snapshot has {len})")]
    NotFound { index: usize, len: usize },
}

/// One embedded script failed. Always isolated to that script.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptTaskError {
    #[error("failed to load script {src}: {reason}")]
    Load { src: String, reason: String },
    #[error("script {src} did not load within {}s", .after.as_secs())]
    Timeout { src: String, after: Duration },
}
