use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;

use quiz_core::model::Question;

use super::QuestionSource;
use crate::error::SourceError;

/// In-memory question source over a preloaded question list.
///
/// Serves questions in order, cycling once the list is exhausted. A number
/// of initial load failures can be scripted to exercise retry flows.
pub struct FixedQuestionSource {
    questions: Vec<Question>,
    cursor: Mutex<usize>,
    loaded: AtomicBool,
    failures_left: AtomicU32,
}

impl FixedQuestionSource {
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            cursor: Mutex::new(0),
            loaded: AtomicBool::new(false),
            failures_left: AtomicU32::new(0),
        }
    }

    /// Make the next `failures` calls to `load_dataset` fail before any
    /// load succeeds.
    #[must_use]
    pub fn failing_first(self, failures: u32) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl QuestionSource for FixedQuestionSource {
    async fn load_dataset(&self) -> Result<(), SourceError> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok()
        {
            return Err(SourceError::DataUnavailable(
                "scripted load failure".into(),
            ));
        }

        if self.questions.is_empty() {
            return Err(SourceError::DataUnavailable("dataset is empty".into()));
        }

        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn next_question(&self) -> Result<Question, SourceError> {
        if !self.loaded.load(Ordering::SeqCst) {
            return Err(SourceError::DataUnavailable(
                "dataset is not loaded".into(),
            ));
        }

        let mut cursor = self
            .cursor
            .lock()
            .map_err(|e| SourceError::DataUnavailable(e.to_string()))?;
        let question = self.questions[*cursor % self.questions.len()].clone();
        *cursor += 1;
        Ok(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(text: &str, correct_answer: bool) -> Question {
        Question::new(text, Vec::new(), correct_answer)
    }

    #[tokio::test]
    async fn serves_questions_in_order_and_cycles() {
        let source = FixedQuestionSource::new(vec![
            question("one", true),
            question("two", false),
        ]);
        source.load_dataset().await.unwrap();

        assert_eq!(source.next_question().await.unwrap().text(), "one");
        assert_eq!(source.next_question().await.unwrap().text(), "two");
        assert_eq!(source.next_question().await.unwrap().text(), "one");
    }

    #[tokio::test]
    async fn scripted_failures_then_success() {
        let source =
            FixedQuestionSource::new(vec![question("one", true)]).failing_first(2);

        assert!(source.load_dataset().await.is_err());
        assert!(source.load_dataset().await.is_err());
        source.load_dataset().await.unwrap();
        assert_eq!(source.next_question().await.unwrap().text(), "one");
    }

    #[tokio::test]
    async fn question_before_load_is_unavailable() {
        let source = FixedQuestionSource::new(vec![question("one", true)]);
        assert!(matches!(
            source.next_question().await,
            Err(SourceError::DataUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn empty_list_fails_to_load() {
        let source = FixedQuestionSource::new(Vec::new());
        assert!(matches!(
            source.load_dataset().await,
            Err(SourceError::DataUnavailable(_))
        ));
    }
}
