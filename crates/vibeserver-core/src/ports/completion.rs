//! Completion port: the model session as seen by the request pipeline.
//!
//! A session turns a prompt into a lazy, finite, ordered stream of text
//! fragments. Concatenating the fragments gives the full completion.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use thiserror::Error;

/// Ordered stream of completion fragments.
///
/// The stream is not restartable. An `Err` item ends the completion.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, CompletionError>> + Send>>;

/// Errors from a single completion call.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The backend refused the request before streaming started.
    #[error("Backend returned status {status}: {message}")]
    Rejected {
        /// HTTP status from the backend
        status: u16,
        /// Body or reason reported by the backend
        message: String,
    },

    /// The connection to the backend failed.
    #[error("Backend unreachable: {0}")]
    Transport(String),

    /// The stream broke off after it had started.
    #[error("Completion stream interrupted: {0}")]
    Interrupted(String),
}

/// Port for issuing completions against the shared model session.
///
/// Implementations must be safe for concurrent use: every request calls
/// `complete` on the same instance without locking.
#[async_trait]
pub trait CompletionPort: Send + Sync + fmt::Debug {
    /// Start a completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError` if the backend cannot start streaming.
    async fn complete(&self, prompt: &str) -> Result<FragmentStream, CompletionError>;
}

/// Drain `stream`, handing every fragment to `observer` before appending it.
///
/// The observer is a side channel (console echo, trace logging). It never
/// affects the returned text.
pub async fn collect_completion<F>(
    mut stream: FragmentStream,
    mut observer: F,
) -> Result<String, CompletionError>
where
    F: FnMut(&str) + Send,
{
    let mut full = String::new();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        observer(&fragment);
        full.push_str(&fragment);
    }
    Ok(full)
}
