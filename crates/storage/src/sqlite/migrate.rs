use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS vocabulary_items (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            source_lang TEXT NOT NULL,
            target_lang TEXT NOT NULL,
            text TEXT NOT NULL,
            translation TEXT NOT NULL,
            example TEXT,
            phonetic TEXT,
            created_at TEXT NOT NULL,
            CHECK (source_lang <> target_lang),
            UNIQUE (id, user_id)
        );
    ",
    r"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_vocabulary_user_pair_text
            ON vocabulary_items (user_id, source_lang, target_lang, text COLLATE NOCASE);
    ",
    r"
        CREATE TABLE IF NOT EXISTS retention_states (
            item_id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            interval_days INTEGER NOT NULL CHECK (interval_days >= 0),
            repetitions INTEGER NOT NULL CHECK (repetitions >= 0),
            easiness REAL NOT NULL CHECK (easiness >= 1.3),
            due_at TEXT NOT NULL,
            last_reviewed_at TEXT,
            FOREIGN KEY (item_id, user_id)
                REFERENCES vocabulary_items(id, user_id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_retention_user_due
            ON retention_states (user_id, due_at);
    ",
    r"
        CREATE TABLE IF NOT EXISTS review_logs (
            id INTEGER PRIMARY KEY,
            item_id INTEGER NOT NULL,
            quality INTEGER NOT NULL CHECK (quality BETWEEN 0 AND 5),
            reviewed_at TEXT NOT NULL,
            response_time_ms INTEGER CHECK (response_time_ms >= 0),
            FOREIGN KEY (item_id) REFERENCES vocabulary_items(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_review_logs_item_reviewed_at
            ON review_logs (item_id, reviewed_at);
    ",
];

/// Applies versioned schema migrations that have not run yet.
///
/// Each version runs inside its own transaction and is recorded in `schema_migrations`.
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

    let versions: [(i64, &[&str]); 1] = [(1, SCHEMA_V1)];

    for (version, statements) in versions {
        if is_applied(pool, version).await? {
            continue;
        }

        let mut tx = pool.begin().await?;
        for statement in statements {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(version)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version, "applied schema migration");
    }

    Ok(())
}
