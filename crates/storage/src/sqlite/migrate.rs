use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the statistics aggregate table and seeds its only row.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        debug!("applying sqlite schema version 1");
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS stats_aggregate (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    games_count INTEGER NOT NULL CHECK (games_count >= 0),
                    total_correct INTEGER NOT NULL CHECK (total_correct >= 0),
                    total_questions INTEGER NOT NULL CHECK (total_questions >= total_correct),
                    best_correct INTEGER,
                    best_total INTEGER,
                    best_completed_at TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO stats_aggregate (
                    id, games_count, total_correct, total_questions,
                    best_correct, best_total, best_completed_at
                )
                VALUES (1, 0, 0, 0, NULL, NULL, NULL)
                ON CONFLICT(id) DO NOTHING
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
