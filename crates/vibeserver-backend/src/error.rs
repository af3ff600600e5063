//! Error types for backend session setup.
//!
//! Per-request failures are reported as
//! [`vibeserver_core::CompletionError`]; this module covers startup.

use thiserror::Error;

/// Result type alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors related to reaching the completion backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The requested model can't be used. Startup must abort.
    #[error("Model '{requested}' is unavailable: {reason}")]
    ModelUnavailable {
        /// Identifier that was asked for
        requested: String,
        /// Identifiers the backend does offer (may be empty)
        available: Vec<String>,
        /// Why the model could not be used
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// API request failed with an HTTP error status.
    #[error("Backend request failed with status {status}: {url}")]
    ApiRequestFailed {
        /// HTTP status code
        status: u16,
        /// The URL that was requested
        url: String,
    },

    /// API returned an invalid or unexpected response.
    #[error("Invalid response from backend: {message}")]
    InvalidResponse {
        /// Description of what was invalid
        message: String,
    },

    /// Network or HTTP client error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl BackendError {
    /// Alternatives worth suggesting to the operator.
    pub fn available_models(&self) -> &[String] {
        match self {
            Self::ModelUnavailable { available, .. } => available,
            _ => &[],
        }
    }
}
