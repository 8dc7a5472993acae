use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quiz_core::model::Question;
use services::{QuestionSource, SourceError};
use quiz_core::time::{fixed_clock, fixed_now};
use services::{
    FixedQuestionSource, QuizDisplay, QuizSession, SessionError, SessionRunner,
};
use storage::repository::{InMemoryStatsRepository, StatsRepository};

#[derive(Debug, Clone, PartialEq, Eq)]
enum DisplayEvent {
    Question { text: String, position: String },
    Result { report: String, retry_label: String },
    Highlight(bool),
    Error(String),
    InputEnabled(bool),
}

#[derive(Default)]
struct RecordingDisplay {
    events: Mutex<Vec<DisplayEvent>>,
}

impl RecordingDisplay {
    fn events(&self) -> Vec<DisplayEvent> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: DisplayEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl QuizDisplay for RecordingDisplay {
    fn present_question(&self, question: &Question, position: &str) {
        self.push(DisplayEvent::Question {
            text: question.text().to_string(),
            position: position.to_string(),
        });
    }

    fn present_result(&self, report: &str, retry_label: &str) {
        self.push(DisplayEvent::Result {
            report: report.to_string(),
            retry_label: retry_label.to_string(),
        });
    }

    fn highlight_answer(&self, is_correct: bool) {
        self.push(DisplayEvent::Highlight(is_correct));
    }

    fn show_loading(&self) {}

    fn hide_loading(&self) {}

    fn show_recoverable_error(&self, message: &str) {
        self.push(DisplayEvent::Error(message.to_string()));
    }

    fn set_input_enabled(&self, enabled: bool) {
        self.push(DisplayEvent::InputEnabled(enabled));
    }
}

fn questions(n: u32) -> Vec<Question> {
    (0..n)
        .map(|i| Question::new(format!("Q{i}"), Vec::new(), i % 2 == 0))
        .collect()
}

fn runner_with(
    source: FixedQuestionSource,
) -> (SessionRunner, Arc<InMemoryStatsRepository>, Arc<RecordingDisplay>) {
    let stats = Arc::new(InMemoryStatsRepository::new());
    let display = Arc::new(RecordingDisplay::default());
    let runner = SessionRunner::new(
        fixed_clock(),
        Arc::new(source),
        stats.clone(),
        display.clone(),
    );
    (runner, stats, display)
}

#[tokio::test]
async fn full_session_records_stats_and_reports() {
    let (runner, stats, display) = runner_with(FixedQuestionSource::new(questions(3)));
    let mut session = QuizSession::new(3);

    runner.start(&mut session).await.unwrap();

    let mut last = None;
    while !session.is_finished() {
        let correct = session.current_question().unwrap().correct_answer();
        last = Some(runner.answer(&mut session, correct).await.unwrap());
    }

    let outcome = last.unwrap();
    assert!(outcome.is_complete);
    let report = outcome.report.expect("final report");
    assert!(report.contains("Your result: 3/3"));
    assert!(report.contains("Games played: 1"));

    let aggregate = stats.load().await.unwrap();
    assert_eq!(aggregate.games_count(), 1);
    assert_eq!(aggregate.total_correct(), 3);
    assert_eq!(aggregate.best_game().unwrap().completed_at(), fixed_now());

    assert!(display.events().iter().any(|event| matches!(
        event,
        DisplayEvent::Result { retry_label, .. } if retry_label == "Play again"
    )));
}

#[tokio::test]
async fn wrong_answers_are_scored_as_incorrect() {
    let (runner, stats, display) = runner_with(FixedQuestionSource::new(questions(2)));
    let mut session = QuizSession::new(2);

    runner.start(&mut session).await.unwrap();
    while !session.is_finished() {
        let wrong = !session.current_question().unwrap().correct_answer();
        runner.answer(&mut session, wrong).await.unwrap();
    }

    assert_eq!(session.correct_count(), 0);
    assert_eq!(stats.load().await.unwrap().total_correct(), 0);
    assert!(display
        .events()
        .iter()
        .any(|event| matches!(event, DisplayEvent::Highlight(false))));
}

#[tokio::test]
async fn load_failure_is_recoverable_and_retry_succeeds() {
    let source = FixedQuestionSource::new(questions(2)).failing_first(1);
    let (runner, stats, display) = runner_with(source);
    let mut session = QuizSession::new(2);

    let err = runner.start(&mut session).await.unwrap_err();
    assert!(matches!(err, SessionError::Source(_)));
    assert_eq!(session.index(), 0);
    assert!(session.current_question().is_none());
    assert!(display
        .events()
        .iter()
        .any(|event| matches!(event, DisplayEvent::Error(_))));

    // The retry action re-invokes the load and proceeds normally.
    runner.start(&mut session).await.unwrap();
    assert!(session.current_question().is_some());
    assert!(display.events().iter().any(|event| matches!(
        event,
        DisplayEvent::Question { position, .. } if position == "1/2"
    )));

    assert_eq!(stats.load().await.unwrap().games_count(), 0);
}

#[tokio::test]
async fn restart_after_completion_plays_a_second_game() {
    let (runner, stats, _display) = runner_with(FixedQuestionSource::new(questions(2)));
    let mut session = QuizSession::new(2);

    runner.start(&mut session).await.unwrap();
    while !session.is_finished() {
        let correct = session.current_question().unwrap().correct_answer();
        runner.answer(&mut session, correct).await.unwrap();
    }

    runner.restart(&mut session).await.unwrap();
    assert!(!session.is_finished());
    assert_eq!(session.index(), 0);
    assert_eq!(session.correct_count(), 0);
    assert!(session.current_question().is_some());

    while !session.is_finished() {
        let wrong = !session.current_question().unwrap().correct_answer();
        runner.answer(&mut session, wrong).await.unwrap();
    }

    let aggregate = stats.load().await.unwrap();
    assert_eq!(aggregate.games_count(), 2);
    // The perfect first game stays the best one.
    assert_eq!(aggregate.best_game().unwrap().correct(), 2);
}

/// Source whose first question fetches fail after a successful load.
struct FlakyQuestionSource {
    inner: FixedQuestionSource,
    fetch_failures_left: AtomicU32,
}

#[async_trait]
impl QuestionSource for FlakyQuestionSource {
    async fn load_dataset(&self) -> Result<(), SourceError> {
        self.inner.load_dataset().await
    }

    async fn next_question(&self) -> Result<Question, SourceError> {
        if self
            .fetch_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok()
        {
            return Err(SourceError::DataUnavailable("fetch failed".into()));
        }
        self.inner.next_question().await
    }
}

#[tokio::test]
async fn failed_question_fetch_is_retried_without_reload() {
    let source = FlakyQuestionSource {
        inner: FixedQuestionSource::new(questions(2)),
        fetch_failures_left: AtomicU32::new(1),
    };
    let stats = Arc::new(InMemoryStatsRepository::new());
    let display = Arc::new(RecordingDisplay::default());
    let runner = SessionRunner::new(fixed_clock(), Arc::new(source), stats, display);
    let mut session = QuizSession::new(2);

    let err = runner.start(&mut session).await.unwrap_err();
    assert!(matches!(err, SessionError::Source(_)));
    assert!(session.dataset_loaded());
    assert!(session.current_question().is_none());

    // The same outstanding request is retried; no second dataset load.
    runner.start(&mut session).await.unwrap();
    assert_eq!(session.position_label(), "1/2");
    assert!(session.current_question().is_some());
}

#[tokio::test]
async fn answer_without_pending_question_is_rejected() {
    let (runner, _stats, _display) = runner_with(FixedQuestionSource::new(questions(2)));
    let mut session = QuizSession::new(2);

    let err = runner.answer(&mut session, true).await.unwrap_err();
    assert!(matches!(err, SessionError::NoCurrentQuestion));
}
