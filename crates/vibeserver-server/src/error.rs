//! Per-request errors.

use std::io;

use thiserror::Error;
use vibeserver_core::{CompletionError, UnsupportedMethod};

/// Anything that stops a single request from being answered by the model.
///
/// None of these are fatal to the server.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The peer closed the connection before sending a request line.
    #[error("Connection closed before a request was received")]
    ConnectionClosed,

    #[error("Malformed request line: {0:?}")]
    MalformedRequestLine(String),

    #[error("Malformed header line: {0:?}")]
    MalformedHeader(String),

    /// The head ended (EOF) before the blank line.
    #[error("Request head was truncated")]
    TruncatedHead,

    #[error("Request head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },

    #[error("Request body of {length} bytes exceeds {limit} bytes")]
    BodyTooLarge { length: usize, limit: usize },

    #[error(transparent)]
    UnsupportedMethod(#[from] UnsupportedMethod),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Completion(#[from] CompletionError),
}

impl RequestError {
    /// Status code the client sees for this error.
    pub const fn status(&self) -> u16 {
        match self {
            Self::UnsupportedMethod(_) => 501,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let unsupported = RequestError::from(UnsupportedMethod("TRACE".to_string()));
        assert_eq!(unsupported.status(), 501);
        assert_eq!(unsupported.to_string(), "Unsupported method: TRACE");

        let oversize = RequestError::BodyTooLarge {
            length: 10,
            limit: 4,
        };
        assert_eq!(oversize.status(), 500);
        assert!(oversize.to_string().contains("exceeds 4 bytes"));
    }

    #[test]
    fn test_completion_error_is_transparent() {
        let err = RequestError::from(CompletionError::Transport("connection refused".to_string()));
        assert_eq!(err.to_string(), "Backend unreachable: connection refused");
    }
}
