use chrono::{DateTime, Utc};
use lexi_core::model::{ItemId, LanguagePair, UserId, ValidatedItem, VocabularyItem};

use super::{
    SqliteRepository,
    mapping::{conn_err, id_to_i64, map_item_row, map_pair_stats_row, write_err},
};
use crate::repository::{PairStats, StorageError, VocabularyRepository};

#[async_trait::async_trait]
impl VocabularyRepository for SqliteRepository {
    async fn insert_item(&self, item: ValidatedItem) -> Result<VocabularyItem, StorageError> {
        let user_id = id_to_i64("user_id", item.user_id.value())?;

        let res = sqlx::query(
            r"
            INSERT INTO vocabulary_items (
                user_id, source_lang, target_lang, text, translation, example, phonetic, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(user_id)
        .bind(item.pair.source().code())
        .bind(item.pair.target().code())
        .bind(item.text.as_str())
        .bind(item.translation.as_str())
        .bind(item.example.as_deref())
        .bind(item.phonetic.as_deref())
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        let id = u64::try_from(res.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("item id sign overflow".into()))?;
        let stored = item.assign_id(ItemId::new(id));
        tracing::debug!(item_id = %stored.id, user_id = %stored.user_id, "vocabulary item inserted");
        Ok(stored)
    }

    async fn update_item(&self, item: &VocabularyItem) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE vocabulary_items
            SET text = ?2, translation = ?3, example = ?4, phonetic = ?5
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("item_id", item.id.value())?)
        .bind(item.text.as_str())
        .bind(item.translation.as_str())
        .bind(item.example.as_deref())
        .bind(item.phonetic.as_deref())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<VocabularyItem>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, source_lang, target_lang, text, translation, example, phonetic, created_at
            FROM vocabulary_items
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("item_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?;

        row.as_ref().map(map_item_row).transpose()
    }

    async fn list_items(
        &self,
        user_id: UserId,
        pair: Option<LanguagePair>,
    ) -> Result<Vec<VocabularyItem>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, source_lang, target_lang, text, translation, example, phonetic, created_at
            FROM vocabulary_items
            WHERE user_id = ?1
              AND (?2 IS NULL OR (source_lang = ?2 AND target_lang = ?3))
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .bind(pair.map(|p| p.source().code()))
        .bind(pair.map(|p| p.target().code()))
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        rows.iter().map(map_item_row).collect()
    }

    async fn list_unlearned(
        &self,
        user_id: UserId,
        pair: Option<LanguagePair>,
        limit: Option<u32>,
    ) -> Result<Vec<VocabularyItem>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT v.id, v.user_id, v.source_lang, v.target_lang, v.text, v.translation,
                   v.example, v.phonetic, v.created_at
            FROM vocabulary_items v
            LEFT JOIN retention_states r ON r.item_id = v.id
            WHERE v.user_id = ?1
              AND r.item_id IS NULL
              AND (?2 IS NULL OR (v.source_lang = ?2 AND v.target_lang = ?3))
            ORDER BY v.created_at ASC, v.id ASC
            LIMIT ?4
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .bind(pair.map(|p| p.source().code()))
        .bind(pair.map(|p| p.target().code()))
        .bind(limit.map_or(-1, i64::from))
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        rows.iter().map(map_item_row).collect()
    }

    async fn pair_stats(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<PairStats>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT
                v.source_lang, v.target_lang,
                COUNT(*) AS total,
                COUNT(r.item_id) AS learned,
                COALESCE(SUM(CASE WHEN r.due_at <= ?2 THEN 1 ELSE 0 END), 0) AS due
            FROM vocabulary_items v
            LEFT JOIN retention_states r ON r.item_id = v.id
            WHERE v.user_id = ?1
            GROUP BY v.source_lang, v.target_lang
            ORDER BY v.source_lang ASC, v.target_lang ASC
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        rows.iter().map(map_pair_stats_row).collect()
    }

    async fn delete_item(&self, id: ItemId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM vocabulary_items WHERE id = ?1")
            .bind(id_to_i64("item_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        tracing::debug!(item_id = %id, "vocabulary item deleted");
        Ok(())
    }
}
