use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::StatsAggregate;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the lifetime statistics aggregate.
///
/// The repository is the sole owner of the persisted representation; callers
/// only ever see whole [`StatsAggregate`] values.
#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// Load the persisted aggregate, or an empty one when nothing has been
    /// stored yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the backing store cannot be read or the
    /// persisted values fail aggregate validation.
    async fn load(&self) -> Result<StatsAggregate, StorageError>;

    /// Record one completed game and return the updated aggregate.
    ///
    /// The read-modify-write must be atomic with respect to concurrent
    /// session completions; a failed write leaves the prior persisted state
    /// intact.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the game is invalid or persistence fails.
    async fn record_game(
        &self,
        correct: u32,
        total: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<StatsAggregate, StorageError>;
}

/// Simple in-memory statistics store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryStatsRepository {
    aggregate: Arc<Mutex<StatsAggregate>>,
}

impl InMemoryStatsRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            aggregate: Arc::new(Mutex::new(StatsAggregate::empty())),
        }
    }
}

#[async_trait]
impl StatsRepository for InMemoryStatsRepository {
    async fn load(&self) -> Result<StatsAggregate, StorageError> {
        let guard = self
            .aggregate
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn record_game(
        &self,
        correct: u32,
        total: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<StatsAggregate, StorageError> {
        let mut guard = self
            .aggregate
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        // Apply to a copy first so a rejected game leaves the store untouched.
        let mut next = guard.clone();
        next.record(correct, total, completed_at)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        *guard = next.clone();
        Ok(next)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub stats: Arc<dyn StatsRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            stats: Arc::new(InMemoryStatsRepository::new()),
        }
    }
}
