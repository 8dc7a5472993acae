mod progress;
mod report;
mod state;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use report::{RETRY_LABEL, format_report};
pub use state::{
    Advance, AnswerRecorded, DEFAULT_QUESTIONS_PER_SESSION, QuestionTicket, QuizSession,
};
pub use workflow::{AnswerOutcome, RevealDelay, SessionRunner};
