//! Error types for the E2E harness

use thiserror::Error;

/// Result type alias using the harness error
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

/// Harness error taxonomy
///
/// Transient timing gaps are absorbed by the wait layer (retry with a
/// fallback strategy) and only surface here as `WaitTimeout` once
/// exhausted. `Precondition`, `ConvergenceExhausted` and
/// `StructuralAbsence` are fatal for the current scenario.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("precondition failed: '{field}' is missing or empty; the '{producer}' scenario must run first and populate it")]
    Precondition { field: String, producer: String },

    #[error("row-action loop exhausted after {iterations} iterations without converging (search term: '{search_term}')")]
    ConvergenceExhausted {
        iterations: u32,
        search_term: String,
    },

    #[error("expected element never appeared: {0}")]
    StructuralAbsence(String),

    #[error("action rejected: {0}")]
    ActionRejected(String),

    #[error("timed out after {waited_ms} ms waiting for: {what}")]
    WaitTimeout { what: String, waited_ms: u64 },

    #[error("API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("driver error: {0}")]
    Driver(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl HarnessError {
    /// Precondition failure naming the field and the scenario expected to
    /// have populated it.
    pub fn precondition(field: &str, producer: &str) -> Self {
        HarnessError::Precondition {
            field: field.to_string(),
            producer: producer.to_string(),
        }
    }
}
