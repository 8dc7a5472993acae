mod fixed;
mod remote;

pub use fixed::FixedQuestionSource;
pub use remote::{
    DatasetRecord, DatasetTransport, HttpDatasetTransport, RemoteConfig, RemoteQuestionSource,
};

use async_trait::async_trait;
use quiz_core::model::Question;

use crate::error::SourceError;

/// Asynchronous producer of quiz questions.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetch and parse the underlying dataset.
    ///
    /// Must succeed once before any question request; a failed load may be
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::DataUnavailable` on transport or parse failure.
    async fn load_dataset(&self) -> Result<(), SourceError>;

    /// Yield exactly one question.
    ///
    /// The selection policy is implementation-defined; implementations avoid
    /// repeating questions on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::DataUnavailable` when the dataset has not been
    /// loaded or cannot serve a question.
    async fn next_question(&self) -> Result<Question, SourceError>;
}
