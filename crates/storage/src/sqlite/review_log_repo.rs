use lexi_core::model::{ItemId, RetentionState, ReviewLog};

use super::{
    SqliteRepository,
    mapping::{conn_err, id_to_i64, map_review_log_row, write_err},
};
use crate::repository::{ReviewLogRecord, ReviewLogRepository, ReviewPersistence, StorageError};

#[async_trait::async_trait]
impl ReviewLogRepository for SqliteRepository {
    async fn logs_for_item(&self, item_id: ItemId) -> Result<Vec<ReviewLogRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, item_id, quality, reviewed_at, response_time_ms
                FROM review_logs
                WHERE item_id = ?1
                ORDER BY reviewed_at ASC, id ASC
            ",
        )
        .bind(id_to_i64("item_id", item_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        rows.iter().map(map_review_log_row).collect()
    }
}

#[async_trait::async_trait]
impl ReviewPersistence for SqliteRepository {
    async fn commit_review(
        &self,
        state: &RetentionState,
        log: &ReviewLog,
    ) -> Result<i64, StorageError> {
        if log.item_id != state.item_id() {
            return Err(StorageError::Conflict);
        }

        let item_id = id_to_i64("item_id", state.item_id().value())?;

        let mut tx = self.pool.begin().await.map_err(conn_err)?;

        let updated = sqlx::query(
            r"
            UPDATE retention_states
            SET interval_days = ?2, repetitions = ?3, easiness = ?4, due_at = ?5, last_reviewed_at = ?6
            WHERE item_id = ?1 AND user_id = ?7
            ",
        )
        .bind(item_id)
        .bind(i64::from(state.interval_days()))
        .bind(i64::from(state.repetitions()))
        .bind(state.easiness())
        .bind(state.due_at())
        .bind(state.last_reviewed_at())
        .bind(id_to_i64("user_id", state.user_id().value())?)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        // Dropping the transaction rolls it back.
        if updated.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        let res = sqlx::query(
            r"
                INSERT INTO review_logs (item_id, quality, reviewed_at, response_time_ms)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(item_id)
        .bind(i64::from(log.quality.value()))
        .bind(log.reviewed_at)
        .bind(log.response_time_ms.map(i64::from))
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        tx.commit().await.map_err(conn_err)?;

        let log_id = res.last_insert_rowid();
        tracing::debug!(
            item_id = %state.item_id(),
            log_id,
            quality = log.quality.value(),
            due_at = %state.due_at(),
            "review committed"
        );
        Ok(log_id)
    }
}
