use thiserror::Error;
use uuid::Uuid;

/// Failure taxonomy of the task store. The store never retries; every
/// failure surfaces immediately and the caller decides what the user sees.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Rejected client-side before any request was made.
    #[error("{0}")]
    Validation(&'static str),

    /// The target id no longer exists server-side.
    #[error("task not found: {0}")]
    NotFound(Uuid),

    /// Network or server failure; the previous view stays as it was.
    #[error("task store request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Transport(err.to_string())
    }
}
