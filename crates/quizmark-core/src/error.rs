//! Result store error types.
//!
//! Defined in `quizmark-core` so the grading engine can decide on retries
//! from the error variant rather than its message.

use thiserror::Error;

/// Errors that can occur when talking to a result store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with this id.
    #[error("result not found: {0}")]
    NotFound(String),

    /// The record exists and may no longer change.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Missing or rejected credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The backend returned an error response.
    #[error("backend error (HTTP {status}): {message}")]
    Backend { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// Local storage failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns `true` if retrying cannot help.
    pub fn is_permanent(&self) -> bool {
        match self {
            StoreError::NotFound(_)
            | StoreError::Conflict(_)
            | StoreError::Unauthorized(_)
            | StoreError::Serialization(_) => true,
            StoreError::Backend { status, .. } => *status < 500 && !matches!(status, 408 | 429),
            StoreError::Timeout(_) | StoreError::Network(_) | StoreError::Io(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanence() {
        assert!(StoreError::Conflict("x".into()).is_permanent());
        assert!(StoreError::Unauthorized("x".into()).is_permanent());
        assert!(!StoreError::Timeout(5).is_permanent());
        assert!(!StoreError::Network("reset".into()).is_permanent());
        assert!(!StoreError::Backend {
            status: 503,
            message: "busy".into()
        }
        .is_permanent());
        assert!(!StoreError::Backend {
            status: 429,
            message: "slow down".into()
        }
        .is_permanent());
        assert!(!StoreError::Backend {
            status: 408,
            message: "request timeout".into()
        }
        .is_permanent());
        assert!(StoreError::Backend {
            status: 400,
            message: "bad".into()
        }
        .is_permanent());
    }

    #[test]
    fn display() {
        let err = StoreError::Backend {
            status: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "backend error (HTTP 502): bad gateway");
    }
}
