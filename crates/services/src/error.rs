//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;

/// Errors emitted while talking to the remote question dataset.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by question sources.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    /// The dataset could not be fetched, parsed, or served; recoverable by
    /// retrying the load. Carries a human-readable cause.
    #[error("question data unavailable: {0}")]
    DataUnavailable(String),
}

impl From<TransportError> for SourceError {
    fn from(err: TransportError) -> Self {
        Self::DataUnavailable(err.to_string())
    }
}

/// Errors emitted by the quiz session engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no question is awaiting an answer")]
    NoCurrentQuestion,
    #[error("question response does not match the current request")]
    StaleResponse,
    #[error("session already started")]
    AlreadyStarted,
    #[error("session already finished")]
    AlreadyFinished,
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
