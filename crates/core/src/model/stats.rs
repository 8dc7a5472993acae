use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StatsError {
    #[error("invalid game result: {correct}/{total}")]
    InvalidGame { correct: u32, total: u32 },

    #[error("games were recorded but no best game is present")]
    MissingBestGame,

    #[error("best game present without any recorded games")]
    UnexpectedBestGame,

    #[error("lifetime correct ({correct}) exceeds lifetime questions ({questions})")]
    InconsistentTotals { correct: u64, questions: u64 },
}

/// Outcome of one completed quiz game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    correct: u32,
    total: u32,
    completed_at: DateTime<Utc>,
}

impl GameRecord {
    /// Create a record for a finished game.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::InvalidGame` when `total` is zero or `correct`
    /// exceeds `total`.
    pub fn new(correct: u32, total: u32, completed_at: DateTime<Utc>) -> Result<Self, StatsError> {
        if total == 0 || correct > total {
            return Err(StatsError::InvalidGame { correct, total });
        }
        Ok(Self {
            correct,
            total,
            completed_at,
        })
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Fraction of correct answers in this game.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        f64::from(self.correct) / f64::from(self.total)
    }

    /// Compares accuracy against another record without float rounding.
    ///
    /// Equal ratios (e.g. 5/10 vs 1/2) compare as `Ordering::Equal`.
    #[must_use]
    pub fn cmp_accuracy(&self, other: &GameRecord) -> Ordering {
        let lhs = u64::from(self.correct) * u64::from(other.total);
        let rhs = u64::from(other.correct) * u64::from(self.total);
        lhs.cmp(&rhs)
    }
}

/// Lifetime statistics across all completed games.
///
/// The aggregate is mutated by exactly one operation, [`StatsAggregate::record`],
/// once per completed session; repositories persist it as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsAggregate {
    games_count: u32,
    total_correct: u64,
    total_questions: u64,
    best_game: Option<GameRecord>,
}

impl StatsAggregate {
    /// The aggregate before any game has been recorded.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            games_count: 0,
            total_correct: 0,
            total_questions: 0,
            best_game: None,
        }
    }

    /// Rehydrate an aggregate from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `StatsError` when the persisted values violate the aggregate
    /// invariants: totals out of order, or a best game that does not match
    /// the games count.
    pub fn from_persisted(
        games_count: u32,
        total_correct: u64,
        total_questions: u64,
        best_game: Option<GameRecord>,
    ) -> Result<Self, StatsError> {
        if total_correct > total_questions {
            return Err(StatsError::InconsistentTotals {
                correct: total_correct,
                questions: total_questions,
            });
        }
        if games_count > 0 && best_game.is_none() {
            return Err(StatsError::MissingBestGame);
        }
        if games_count == 0 && best_game.is_some() {
            return Err(StatsError::UnexpectedBestGame);
        }

        Ok(Self {
            games_count,
            total_correct,
            total_questions,
            best_game,
        })
    }

    /// Record a completed game and return the created record.
    ///
    /// Replaces the best game when the new record's accuracy is greater than
    /// or equal to the current best; exact ties keep the newer record.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::InvalidGame` for an impossible result. The
    /// aggregate is left untouched in that case.
    pub fn record(
        &mut self,
        correct: u32,
        total: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<GameRecord, StatsError> {
        let game = GameRecord::new(correct, total, completed_at)?;

        self.games_count = self.games_count.saturating_add(1);
        self.total_correct += u64::from(correct);
        self.total_questions += u64::from(total);

        let replaces_best = match &self.best_game {
            Some(best) => game.cmp_accuracy(best) != Ordering::Less,
            None => true,
        };
        if replaces_best {
            self.best_game = Some(game);
        }

        Ok(game)
    }

    #[must_use]
    pub fn games_count(&self) -> u32 {
        self.games_count
    }

    #[must_use]
    pub fn total_correct(&self) -> u64 {
        self.total_correct
    }

    #[must_use]
    pub fn total_questions(&self) -> u64 {
        self.total_questions
    }

    #[must_use]
    pub fn best_game(&self) -> Option<&GameRecord> {
        self.best_game.as_ref()
    }

    /// Lifetime accuracy, exactly `0.0` before the first game.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_accuracy(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        self.total_correct as f64 / self.total_questions as f64
    }
}

impl Default for StatsAggregate {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn empty_aggregate_has_zero_accuracy() {
        let stats = StatsAggregate::empty();
        assert_eq!(stats.games_count(), 0);
        assert_eq!(stats.total_accuracy(), 0.0);
        assert!(stats.best_game().is_none());
    }

    #[test]
    fn record_accumulates_totals_and_best() {
        let mut stats = StatsAggregate::empty();
        stats.record(7, 10, fixed_now()).unwrap();
        stats.record(9, 10, fixed_now() + Duration::hours(1)).unwrap();

        assert_eq!(stats.games_count(), 2);
        assert_eq!(stats.total_correct(), 16);
        assert_eq!(stats.total_questions(), 20);
        assert_eq!(stats.total_accuracy(), 0.80);
        assert_eq!(stats.best_game().unwrap().correct(), 9);
        assert_eq!(stats.best_game().unwrap().accuracy(), 0.9);
    }

    #[test]
    fn lower_accuracy_does_not_replace_best() {
        let mut stats = StatsAggregate::empty();
        stats.record(9, 10, fixed_now()).unwrap();
        stats.record(3, 10, fixed_now() + Duration::hours(1)).unwrap();

        let best = stats.best_game().unwrap();
        assert_eq!(best.correct(), 9);
        assert_eq!(best.completed_at(), fixed_now());
    }

    #[test]
    fn equal_accuracy_keeps_newer_record() {
        let later = fixed_now() + Duration::hours(1);

        let mut stats = StatsAggregate::empty();
        stats.record(5, 10, fixed_now()).unwrap();
        stats.record(5, 10, later).unwrap();

        assert_eq!(stats.best_game().unwrap().completed_at(), later);
    }

    #[test]
    fn equal_ratio_with_different_totals_is_a_tie() {
        let a = GameRecord::new(5, 10, fixed_now()).unwrap();
        let b = GameRecord::new(1, 2, fixed_now()).unwrap();
        assert_eq!(a.cmp_accuracy(&b), Ordering::Equal);
    }

    #[test]
    fn impossible_result_is_rejected_and_leaves_aggregate_intact() {
        let mut stats = StatsAggregate::empty();
        stats.record(5, 10, fixed_now()).unwrap();

        let err = stats.record(11, 10, fixed_now()).unwrap_err();
        assert!(matches!(err, StatsError::InvalidGame { .. }));
        assert_eq!(stats.games_count(), 1);
        assert_eq!(stats.total_questions(), 10);
    }

    #[test]
    fn zero_length_game_is_rejected() {
        let err = GameRecord::new(0, 0, fixed_now()).unwrap_err();
        assert!(matches!(err, StatsError::InvalidGame { .. }));
    }

    #[test]
    fn from_persisted_round_trips() {
        let best = GameRecord::new(8, 10, fixed_now()).unwrap();
        let stats = StatsAggregate::from_persisted(3, 15, 30, Some(best)).unwrap();
        assert_eq!(stats.games_count(), 3);
        assert_eq!(stats.total_accuracy(), 0.5);
    }

    #[test]
    fn from_persisted_rejects_inconsistent_state() {
        assert!(matches!(
            StatsAggregate::from_persisted(1, 20, 10, None),
            Err(StatsError::InconsistentTotals { .. })
        ));
        assert!(matches!(
            StatsAggregate::from_persisted(2, 5, 10, None),
            Err(StatsError::MissingBestGame)
        ));
        let best = GameRecord::new(1, 2, fixed_now()).unwrap();
        assert!(matches!(
            StatsAggregate::from_persisted(0, 0, 0, Some(best)),
            Err(StatsError::UnexpectedBestGame)
        ));
    }
}
