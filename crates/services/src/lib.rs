#![forbid(unsafe_code)]

pub mod display;
pub mod error;
pub mod sessions;
pub mod source;

pub use quiz_core::Clock;
pub use sessions as session;

pub use display::{NullDisplay, QuizDisplay};
pub use error::{SessionError, SourceError, TransportError};

pub use sessions::{
    Advance, AnswerOutcome, AnswerRecorded, DEFAULT_QUESTIONS_PER_SESSION, QuestionTicket,
    QuizSession, RETRY_LABEL, RevealDelay, SessionProgress, SessionRunner, format_report,
};
pub use source::{
    DatasetRecord, DatasetTransport, FixedQuestionSource, HttpDatasetTransport, QuestionSource,
    RemoteConfig, RemoteQuestionSource,
};
