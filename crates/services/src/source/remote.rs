use std::env;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use quiz_core::model::Question;

use super::QuestionSource;
use crate::error::{SourceError, TransportError};

/// Raw dataset entry as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetRecord {
    pub text: String,
    pub image_ref: String,
    pub correct_answer: bool,
}

#[derive(Debug, Deserialize)]
struct DatasetResponse {
    items: Vec<DatasetRecord>,
}

/// Transport boundary for the remote question dataset.
///
/// Fetching the record list and resolving `image_ref` to bytes are both
/// transport concerns; the source only assembles [`Question`] values.
#[async_trait]
pub trait DatasetTransport: Send + Sync {
    /// Fetch the full record list.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` on network or decode failure.
    async fn fetch_dataset(&self) -> Result<Vec<DatasetRecord>, TransportError>;

    /// Fetch the artwork bytes behind an image reference.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` on network failure.
    async fn fetch_image(&self, image_ref: &str) -> Result<Vec<u8>, TransportError>;
}

#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub base_url: String,
}

impl RemoteConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            env::var("QUIZ_API_URL").unwrap_or_else(|_| "http://localhost:8080".into());
        Self { base_url }
    }
}

/// HTTP transport over a JSON question dataset.
#[derive(Clone)]
pub struct HttpDatasetTransport {
    client: Client,
    config: RemoteConfig,
}

impl HttpDatasetTransport {
    #[must_use]
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::new(RemoteConfig::from_env())
    }

    fn resolve(&self, image_ref: &str) -> String {
        if image_ref.starts_with("http://") || image_ref.starts_with("https://") {
            return image_ref.to_string();
        }
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            image_ref.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl DatasetTransport for HttpDatasetTransport {
    async fn fetch_dataset(&self) -> Result<Vec<DatasetRecord>, TransportError> {
        let url = format!("{}/questions", self.config.base_url.trim_end_matches('/'));
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(TransportError::HttpStatus(response.status()));
        }

        let body: DatasetResponse = response.json().await?;
        Ok(body.items)
    }

    async fn fetch_image(&self, image_ref: &str) -> Result<Vec<u8>, TransportError> {
        let response = self.client.get(self.resolve(image_ref)).send().await?;

        if !response.status().is_success() {
            return Err(TransportError::HttpStatus(response.status()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

struct DatasetState {
    records: Vec<DatasetRecord>,
    // Shuffled index order; `cursor` walks it so every record is served once
    // before any repeats.
    order: Vec<usize>,
    cursor: usize,
}

/// Question source backed by an injected dataset transport.
///
/// Questions are served in a shuffled order that reshuffles only after the
/// whole dataset has been handed out.
pub struct RemoteQuestionSource<T: DatasetTransport> {
    transport: T,
    state: Mutex<Option<DatasetState>>,
}

impl<T: DatasetTransport> RemoteQuestionSource<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: Mutex::new(None),
        }
    }

    fn lock_state(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, Option<DatasetState>>, SourceError> {
        self.state
            .lock()
            .map_err(|e| SourceError::DataUnavailable(e.to_string()))
    }

    fn take_record(&self) -> Result<DatasetRecord, SourceError> {
        let mut guard = self.lock_state()?;
        let Some(state) = guard.as_mut() else {
            return Err(SourceError::DataUnavailable(
                "dataset is not loaded".into(),
            ));
        };

        if state.cursor >= state.order.len() {
            let last_served = state.order.last().copied();
            state.order.shuffle(&mut rand::rng());
            // Avoid an immediate repeat across the reshuffle boundary.
            if state.order.len() > 1 && state.order.first().copied() == last_served {
                state.order.swap(0, 1);
            }
            state.cursor = 0;
        }

        let index = state.order[state.cursor];
        state.cursor += 1;
        Ok(state.records[index].clone())
    }
}

#[async_trait]
impl<T: DatasetTransport> QuestionSource for RemoteQuestionSource<T> {
    async fn load_dataset(&self) -> Result<(), SourceError> {
        let records = self.transport.fetch_dataset().await?;
        if records.is_empty() {
            return Err(SourceError::DataUnavailable("dataset is empty".into()));
        }
        debug!(count = records.len(), "question dataset loaded");

        let mut order: Vec<usize> = (0..records.len()).collect();
        order.shuffle(&mut rand::rng());

        let mut guard = self.lock_state()?;
        *guard = Some(DatasetState {
            records,
            order,
            cursor: 0,
        });
        Ok(())
    }

    async fn next_question(&self) -> Result<Question, SourceError> {
        // The record is cloned out so the lock is not held across the image
        // fetch.
        let record = self.take_record()?;
        let image = self.transport.fetch_image(&record.image_ref).await?;
        Ok(Question::new(record.text, image, record.correct_answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeTransport {
        records: Vec<DatasetRecord>,
        fail_dataset: AtomicBool,
    }

    impl FakeTransport {
        fn new(records: Vec<DatasetRecord>) -> Self {
            Self {
                records,
                fail_dataset: AtomicBool::new(false),
            }
        }

        fn failing() -> Self {
            let transport = Self::new(Vec::new());
            transport.fail_dataset.store(true, Ordering::SeqCst);
            transport
        }
    }

    #[async_trait]
    impl DatasetTransport for FakeTransport {
        async fn fetch_dataset(&self) -> Result<Vec<DatasetRecord>, TransportError> {
            if self.fail_dataset.load(Ordering::SeqCst) {
                return Err(TransportError::HttpStatus(
                    reqwest::StatusCode::SERVICE_UNAVAILABLE,
                ));
            }
            Ok(self.records.clone())
        }

        async fn fetch_image(&self, image_ref: &str) -> Result<Vec<u8>, TransportError> {
            Ok(image_ref.as_bytes().to_vec())
        }
    }

    fn record(text: &str) -> DatasetRecord {
        DatasetRecord {
            text: text.to_string(),
            image_ref: format!("images/{text}.png"),
            correct_answer: true,
        }
    }

    #[tokio::test]
    async fn serves_every_record_once_per_cycle() {
        let source = RemoteQuestionSource::new(FakeTransport::new(vec![
            record("a"),
            record("b"),
            record("c"),
        ]));
        source.load_dataset().await.unwrap();

        let mut seen = HashSet::new();
        for _ in 0..3 {
            let question = source.next_question().await.unwrap();
            seen.insert(question.text().to_string());
        }
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn resolves_image_bytes_through_transport() {
        let source = RemoteQuestionSource::new(FakeTransport::new(vec![record("a")]));
        source.load_dataset().await.unwrap();

        let question = source.next_question().await.unwrap();
        assert_eq!(question.image(), b"images/a.png");
    }

    #[tokio::test]
    async fn question_before_load_is_unavailable() {
        let source = RemoteQuestionSource::new(FakeTransport::new(vec![record("a")]));
        let err = source.next_question().await.unwrap_err();
        assert!(matches!(err, SourceError::DataUnavailable(_)));
    }

    #[tokio::test]
    async fn load_failure_carries_cause() {
        let source = RemoteQuestionSource::new(FakeTransport::failing());
        let err = source.load_dataset().await.unwrap_err();
        let SourceError::DataUnavailable(cause) = err else {
            panic!("expected DataUnavailable");
        };
        assert!(cause.contains("503"));
    }

    #[tokio::test]
    async fn empty_dataset_is_unavailable() {
        let source = RemoteQuestionSource::new(FakeTransport::new(Vec::new()));
        let err = source.load_dataset().await.unwrap_err();
        assert!(matches!(err, SourceError::DataUnavailable(_)));
    }
}
