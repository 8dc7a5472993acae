use std::sync::Arc;
use std::time::Duration;

use quiz_core::Clock;
use storage::repository::StatsRepository;
use tracing::{debug, warn};

use super::report::{RETRY_LABEL, format_report};
use super::state::{Advance, QuestionTicket, QuizSession};
use crate::display::QuizDisplay;
use crate::error::SessionError;
use crate::source::QuestionSource;

/// Pause between scoring an answer and advancing.
///
/// A cooperative timer: waiting never blocks the runtime or other sessions.
#[derive(Debug, Clone, Copy, Default)]
pub enum RevealDelay {
    #[default]
    None,
    Fixed(Duration),
}

impl RevealDelay {
    pub async fn wait(&self) {
        if let RevealDelay::Fixed(delay) = self {
            tokio::time::sleep(*delay).await;
        }
    }
}

/// Result of answering the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub was_correct: bool,
    pub is_complete: bool,
    /// The final report, present once the session finished.
    pub report: Option<String>,
}

/// Drives a quiz session against its collaborators.
///
/// Keeps at most one question request in flight: every fetch is tied to the
/// ticket the session issued for it, and the session rejects deliveries for
/// any other ticket.
#[derive(Clone)]
pub struct SessionRunner {
    clock: Clock,
    source: Arc<dyn QuestionSource>,
    stats: Arc<dyn StatsRepository>,
    display: Arc<dyn QuizDisplay>,
    reveal: RevealDelay,
}

impl SessionRunner {
    #[must_use]
    pub fn new(
        clock: Clock,
        source: Arc<dyn QuestionSource>,
        stats: Arc<dyn StatsRepository>,
        display: Arc<dyn QuizDisplay>,
    ) -> Self {
        Self {
            clock,
            source,
            stats,
            display,
            reveal: RevealDelay::default(),
        }
    }

    #[must_use]
    pub fn with_reveal_delay(mut self, reveal: RevealDelay) -> Self {
        self.reveal = reveal;
        self
    }

    /// Load the dataset and present the first question.
    ///
    /// Calling `start` again after a failure retries whatever step failed:
    /// the dataset load while the session is still initializing, or the
    /// question fetch for the request left outstanding.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Source` when the dataset load or question
    /// fetch fails; the session keeps its state for the retry.
    pub async fn start(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        // A prior start may have loaded the dataset and then lost the
        // question fetch; in that case retry the fetch for the same ticket.
        if let Some(ticket) = session.pending_ticket() {
            return self.present_next(session, ticket).await;
        }

        self.display.show_loading();
        if let Err(err) = self.source.load_dataset().await {
            self.display.hide_loading();
            self.display.show_recoverable_error(&err.to_string());
            return Err(err.into());
        }
        debug!("question dataset loaded");

        let ticket = session.begin()?;
        self.present_next(session, ticket).await
    }

    /// Record an answer for the current question, then advance to the next
    /// question or to the final report.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoCurrentQuestion` when no question is
    /// pending, or source/storage errors from advancing.
    pub async fn answer(
        &self,
        session: &mut QuizSession,
        given: bool,
    ) -> Result<AnswerOutcome, SessionError> {
        let recorded = session.submit_answer(given)?;
        self.display.set_input_enabled(false);
        self.display.highlight_answer(recorded.was_correct);
        self.reveal.wait().await;

        match session.advance()? {
            Advance::Next(ticket) => {
                self.present_next(session, ticket).await?;
                Ok(AnswerOutcome {
                    was_correct: recorded.was_correct,
                    is_complete: false,
                    report: None,
                })
            }
            Advance::Finished { correct, total } => {
                let stats = self
                    .stats
                    .record_game(correct, total, self.clock.now())
                    .await?;
                debug!(
                    correct,
                    total,
                    games = stats.games_count(),
                    "session finished"
                );

                let report = format_report(correct, total, &stats);
                self.display.present_result(&report, RETRY_LABEL);
                Ok(AnswerOutcome {
                    was_correct: recorded.was_correct,
                    is_complete: true,
                    report: Some(report),
                })
            }
        }
    }

    /// Reset the session and present a fresh first question.
    ///
    /// Falls back to a full `start` when the dataset was never loaded.
    ///
    /// # Errors
    ///
    /// Returns source errors from the dataset load or question fetch.
    pub async fn restart(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        match session.restart() {
            Some(ticket) => self.present_next(session, ticket).await,
            None => self.start(session).await,
        }
    }

    async fn present_next(
        &self,
        session: &mut QuizSession,
        ticket: QuestionTicket,
    ) -> Result<(), SessionError> {
        self.display.show_loading();
        let question = match self.source.next_question().await {
            Ok(question) => question,
            Err(err) => {
                self.display.hide_loading();
                self.display.show_recoverable_error(&err.to_string());
                return Err(err.into());
            }
        };

        match session.deliver(question, ticket) {
            Ok(()) => {}
            Err(SessionError::StaleResponse) => {
                // A restart invalidated this request; the response is dropped
                // and the session's own state stands.
                warn!(?ticket, "discarding stale question response");
                self.display.hide_loading();
                return Ok(());
            }
            Err(err) => return Err(err),
        }

        let position = session.position_label();
        if let Some(question) = session.current_question() {
            self.display.present_question(question, &position);
        }
        self.display.hide_loading();
        self.display.set_input_enabled(true);
        Ok(())
    }
}
