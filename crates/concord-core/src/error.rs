//! Error types for the concord-core library.

use std::time::Duration;

use thiserror::Error;

/// Main error type for the concord library.
#[derive(Error, Debug)]
pub enum ConcordError {
    /// Backend failure surfaced outside the result contract.
    #[error("extraction error: {0}")]
    Extraction(#[from] BackendError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The submitted document has no content.
    #[error("document '{0}' is empty")]
    EmptyDocument(String),
}

/// Failures inside a single extraction backend.
///
/// These never escape a backend call; they are rendered into
/// [`ParserResult::errors`](crate::models::document::ParserResult).
#[derive(Error, Debug)]
pub enum BackendError {
    /// Required external configuration is missing.
    #[error("{backend} is not configured: missing {variable}")]
    Unavailable { backend: String, variable: String },

    /// The backend did not finish within its time budget.
    #[error("{backend} timed out after {after:?}")]
    Timeout { backend: String, after: Duration },

    /// The backend panicked while extracting.
    #[error("{backend} panicked: {message}")]
    Panicked { backend: String, message: String },

    /// The backend task disappeared without reporting.
    #[error("{0} task ended without a result")]
    TaskLost(String),

    /// Failed to start an external program.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// External program exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    ExitStatus {
        program: String,
        status: String,
        stderr: String,
    },

    /// External program produced output that is not a parser result.
    #[error("invalid backend output: {0}")]
    InvalidOutput(String),

    /// The document could not be turned into text.
    #[error("unreadable document: {0}")]
    Unreadable(String),
}

/// Result type for the concord library.
pub type Result<T> = std::result::Result<T, ConcordError>;
