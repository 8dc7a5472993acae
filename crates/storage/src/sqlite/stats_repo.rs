use chrono::{DateTime, Utc};
use quiz_core::model::{GameRecord, StatsAggregate};
use sqlx::Row;
use tracing::warn;

use super::SqliteRepository;
use crate::repository::{StatsRepository, StorageError};

/// Attempts before a contended read-modify-write gives up.
const RMW_ATTEMPTS: usize = 3;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn map_aggregate_row(row: &sqlx::sqlite::SqliteRow) -> Result<StatsAggregate, StorageError> {
    let games_count = u32_from_i64(
        "games_count",
        row.try_get::<i64, _>("games_count").map_err(ser)?,
    )?;
    let total_correct = u64_from_i64(
        "total_correct",
        row.try_get::<i64, _>("total_correct").map_err(ser)?,
    )?;
    let total_questions = u64_from_i64(
        "total_questions",
        row.try_get::<i64, _>("total_questions").map_err(ser)?,
    )?;

    let best_correct: Option<i64> = row.try_get("best_correct").map_err(ser)?;
    let best_total: Option<i64> = row.try_get("best_total").map_err(ser)?;
    let best_completed_at: Option<DateTime<Utc>> =
        row.try_get("best_completed_at").map_err(ser)?;

    let best_game = match (best_correct, best_total, best_completed_at) {
        (Some(correct), Some(total), Some(completed_at)) => Some(
            GameRecord::new(
                u32_from_i64("best_correct", correct)?,
                u32_from_i64("best_total", total)?,
                completed_at,
            )
            .map_err(ser)?,
        ),
        (None, None, None) => None,
        _ => {
            return Err(StorageError::Serialization(
                "partial best game columns".into(),
            ));
        }
    };

    StatsAggregate::from_persisted(games_count, total_correct, total_questions, best_game)
        .map_err(ser)
}

#[async_trait::async_trait]
impl StatsRepository for SqliteRepository {
    async fn load(&self) -> Result<StatsAggregate, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    games_count, total_correct, total_questions,
                    best_correct, best_total, best_completed_at
                FROM stats_aggregate
                WHERE id = 1
            ",
        )
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_aggregate_row(&row),
            None => Ok(StatsAggregate::empty()),
        }
    }

    async fn record_game(
        &self,
        correct: u32,
        total: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<StatsAggregate, StorageError> {
        // Optimistic read-modify-write: the update is guarded by the games
        // count we read, so a racing completion makes the write a no-op and
        // we retry from the fresh row. The tie-break and totals logic stays
        // in `StatsAggregate::record`.
        for attempt in 0..RMW_ATTEMPTS {
            let mut next = self.load().await?;
            let expected_games = i64::from(next.games_count());
            next.record(correct, total, completed_at).map_err(ser)?;

            let (best_correct, best_total, best_completed_at) = match next.best_game() {
                Some(best) => (
                    Some(i64::from(best.correct())),
                    Some(i64::from(best.total())),
                    Some(best.completed_at()),
                ),
                None => (None, None, None),
            };

            let result = sqlx::query(
                r"
                    UPDATE stats_aggregate
                    SET games_count = ?1,
                        total_correct = ?2,
                        total_questions = ?3,
                        best_correct = ?4,
                        best_total = ?5,
                        best_completed_at = ?6
                    WHERE id = 1 AND games_count = ?7
                ",
            )
            .bind(i64::from(next.games_count()))
            .bind(i64::try_from(next.total_correct()).map_err(ser)?)
            .bind(i64::try_from(next.total_questions()).map_err(ser)?)
            .bind(best_correct)
            .bind(best_total)
            .bind(best_completed_at)
            .bind(expected_games)
            .execute(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

            if result.rows_affected() == 1 {
                return Ok(next);
            }
            warn!(attempt, "statistics update raced with another completion");
        }

        Err(StorageError::Conflict)
    }
}
