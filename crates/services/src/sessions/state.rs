use std::fmt;

use quiz_core::model::Question;

use super::progress::SessionProgress;
use crate::error::SessionError;

/// Default number of questions per session.
pub const DEFAULT_QUESTIONS_PER_SESSION: u32 = 10;

/// Identifies one outstanding question request.
///
/// A ticket from a previous run (older `generation`) or a different position
/// never matches the current expectation, so late deliveries are rejected
/// instead of applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionTicket {
    generation: u32,
    index: u32,
}

/// Outcome of recording an answer for the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerRecorded {
    pub was_correct: bool,
    pub is_last: bool,
}

/// Where the session goes after the reveal pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Request the question for this ticket next.
    Next(QuestionTicket),
    /// The session is over; record the result.
    Finished { correct: u32, total: u32 },
}

#[derive(Debug)]
enum Phase {
    Initializing,
    AwaitingQuestion { ticket: QuestionTicket },
    AwaitingAnswer { question: Question },
    Scoring { was_correct: bool },
    Finished,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// State machine for one quiz run of a fixed number of questions.
///
/// The current question lives inside the phase, never in a nullable field:
/// answering without a pending question is rejected as
/// [`SessionError::NoCurrentQuestion`] rather than defended with guards at
/// every call site. All asynchronous coordination (loading, fetching,
/// timers, persistence) belongs to [`SessionRunner`].
///
/// [`SessionRunner`]: super::workflow::SessionRunner
pub struct QuizSession {
    total: u32,
    index: u32,
    correct_count: u32,
    generation: u32,
    dataset_loaded: bool,
    phase: Phase,
}

impl QuizSession {
    /// Create a session of `total` questions. A zero length is clamped to 1.
    #[must_use]
    pub fn new(total: u32) -> Self {
        Self {
            total: total.max(1),
            index: 0,
            correct_count: 0,
            generation: 0,
            dataset_loaded: false,
            phase: Phase::Initializing,
        }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Zero-based position of the current question.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished)
    }

    #[must_use]
    pub fn dataset_loaded(&self) -> bool {
        self.dataset_loaded
    }

    /// The question awaiting an answer, if any.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match &self.phase {
            Phase::AwaitingAnswer { question } => Some(question),
            _ => None,
        }
    }

    /// The outstanding question request, if one is awaiting delivery.
    #[must_use]
    pub fn pending_ticket(&self) -> Option<QuestionTicket> {
        match self.phase {
            Phase::AwaitingQuestion { ticket } => Some(ticket),
            _ => None,
        }
    }

    /// 1-based `"i/N"` label for the current question.
    #[must_use]
    pub fn position_label(&self) -> String {
        format!("{}/{}", self.index + 1, self.total)
    }

    /// Number of questions already answered.
    #[must_use]
    pub fn answered_count(&self) -> u32 {
        match self.phase {
            Phase::Scoring { .. } => self.index + 1,
            Phase::Finished => self.total,
            _ => self.index,
        }
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let answered = self.answered_count();
        SessionProgress {
            total: self.total,
            answered,
            remaining: self.total - answered,
            is_complete: self.is_finished(),
        }
    }

    fn issue_ticket(&mut self) -> QuestionTicket {
        let ticket = QuestionTicket {
            generation: self.generation,
            index: self.index,
        };
        self.phase = Phase::AwaitingQuestion { ticket };
        ticket
    }

    /// Mark the dataset as loaded and request the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` unless the session is still
    /// initializing. A failed dataset load needs no call here; the session
    /// simply stays in its initial state until the load is retried.
    pub fn begin(&mut self) -> Result<QuestionTicket, SessionError> {
        if !matches!(self.phase, Phase::Initializing) {
            return Err(SessionError::AlreadyStarted);
        }
        self.dataset_loaded = true;
        Ok(self.issue_ticket())
    }

    /// Install a delivered question for the given ticket.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StaleResponse` when the ticket does not match
    /// the one outstanding request; the question is dropped and the state is
    /// unchanged.
    pub fn deliver(
        &mut self,
        question: Question,
        ticket: QuestionTicket,
    ) -> Result<(), SessionError> {
        match self.phase {
            Phase::AwaitingQuestion { ticket: expected } if expected == ticket => {
                self.phase = Phase::AwaitingAnswer { question };
                Ok(())
            }
            _ => Err(SessionError::StaleResponse),
        }
    }

    /// Record the player's answer for the current question.
    ///
    /// Correctness increments the running count by exactly one; the question
    /// is consumed and the session moves to scoring. Only one answer per
    /// question: repeated submissions are rejected.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoCurrentQuestion` when no question is
    /// awaiting an answer.
    pub fn submit_answer(&mut self, given: bool) -> Result<AnswerRecorded, SessionError> {
        let Phase::AwaitingAnswer { question } = &self.phase else {
            return Err(SessionError::NoCurrentQuestion);
        };

        let was_correct = given == question.correct_answer();
        if was_correct {
            self.correct_count += 1;
        }
        let is_last = self.index + 1 == self.total;
        self.phase = Phase::Scoring { was_correct };

        Ok(AnswerRecorded {
            was_correct,
            is_last,
        })
    }

    /// Leave the scoring phase, after the reveal pause.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoCurrentQuestion` outside the scoring phase,
    /// or `SessionError::AlreadyFinished` once the session is over.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        match self.phase {
            Phase::Scoring { .. } => {}
            Phase::Finished => return Err(SessionError::AlreadyFinished),
            _ => return Err(SessionError::NoCurrentQuestion),
        }

        if self.index + 1 >= self.total {
            self.phase = Phase::Finished;
            return Ok(Advance::Finished {
                correct: self.correct_count,
                total: self.total,
            });
        }

        self.index += 1;
        Ok(Advance::Next(self.issue_ticket()))
    }

    /// Reset counters for a fresh run.
    ///
    /// Bumping the generation invalidates any in-flight question request, so
    /// a late delivery for the previous run is rejected as stale. Returns
    /// the first ticket of the new run when the dataset is already loaded;
    /// `None` means the load never succeeded and must happen first.
    pub fn restart(&mut self) -> Option<QuestionTicket> {
        self.index = 0;
        self.correct_count = 0;
        self.generation = self.generation.wrapping_add(1);

        if self.dataset_loaded {
            Some(self.issue_ticket())
        } else {
            self.phase = Phase::Initializing;
            None
        }
    }
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new(DEFAULT_QUESTIONS_PER_SESSION)
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("total", &self.total)
            .field("index", &self.index)
            .field("correct_count", &self.correct_count)
            .field("generation", &self.generation)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
