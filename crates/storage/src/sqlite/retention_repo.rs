use chrono::{DateTime, Utc};
use lexi_core::model::{ItemId, LanguagePair, RetentionState, UserId};

use super::{
    SqliteRepository,
    mapping::{conn_err, id_to_i64, map_item_row, map_state_row, write_err},
};
use crate::repository::{DueCard, DueQuery, RetentionRepository, StorageError};

#[async_trait::async_trait]
impl RetentionRepository for SqliteRepository {
    async fn load_due(&self, query: &DueQuery) -> Result<Vec<DueCard>, StorageError> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = query.limit.map_or(-1, i64::from);

        let rows = sqlx::query(
            r"
            SELECT
                v.id, v.user_id, v.source_lang, v.target_lang, v.text, v.translation,
                v.example, v.phonetic, v.created_at,
                r.item_id, r.interval_days, r.repetitions, r.easiness, r.due_at, r.last_reviewed_at
            FROM retention_states r
            JOIN vocabulary_items v ON v.id = r.item_id
            WHERE r.user_id = ?1
              AND r.due_at <= ?2
              AND (?3 IS NULL OR (v.source_lang = ?3 AND v.target_lang = ?4))
            ORDER BY r.due_at ASC, v.created_at ASC, v.id ASC
            LIMIT ?5
            ",
        )
        .bind(id_to_i64("user_id", query.user_id.value())?)
        .bind(query.now)
        .bind(query.pair.map(|p| p.source().code()))
        .bind(query.pair.map(|p| p.target().code()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        let mut due = Vec::with_capacity(rows.len());
        for row in &rows {
            due.push(DueCard {
                state: map_state_row(row, "item_id")?,
                item: map_item_row(row)?,
            });
        }
        Ok(due)
    }

    async fn count_due(
        &self,
        user_id: UserId,
        pair: Option<LanguagePair>,
        now: DateTime<Utc>,
    ) -> Result<u32, StorageError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM retention_states r
            JOIN vocabulary_items v ON v.id = r.item_id
            WHERE r.user_id = ?1
              AND r.due_at <= ?2
              AND (?3 IS NULL OR (v.source_lang = ?3 AND v.target_lang = ?4))
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .bind(now)
        .bind(pair.map(|p| p.source().code()))
        .bind(pair.map(|p| p.target().code()))
        .fetch_one(&self.pool)
        .await
        .map_err(conn_err)?;

        u32::try_from(count).map_err(|_| StorageError::Serialization("due count overflow".into()))
    }

    async fn get_state(&self, item_id: ItemId) -> Result<Option<RetentionState>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT item_id, user_id, interval_days, repetitions, easiness, due_at, last_reviewed_at
            FROM retention_states
            WHERE item_id = ?1
            ",
        )
        .bind(id_to_i64("item_id", item_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?;

        row.as_ref()
            .map(|row| map_state_row(row, "item_id"))
            .transpose()
    }

    async fn insert_state(&self, state: &RetentionState) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO retention_states (
                item_id, user_id, interval_days, repetitions, easiness, due_at, last_reviewed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(id_to_i64("item_id", state.item_id().value())?)
        .bind(id_to_i64("user_id", state.user_id().value())?)
        .bind(i64::from(state.interval_days()))
        .bind(i64::from(state.repetitions()))
        .bind(state.easiness())
        .bind(state.due_at())
        .bind(state.last_reviewed_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }
}
