use chrono::{DateTime, Utc};
use lexi_core::model::{
    ItemId, Language, LanguagePair, Quality, RetentionState, ReviewLog, UserId, VocabularyItem,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{PairStats, ReviewLogRecord, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

/// Classifies write failures: constraint hits become domain errors, the rest are connection errors.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn parse_language(column: &str, raw: &str) -> Result<Language, StorageError> {
    raw.parse()
        .map_err(|e| StorageError::Serialization(format!("invalid {column}: {e}")))
}

pub(crate) fn map_item_row(row: &SqliteRow) -> Result<VocabularyItem, StorageError> {
    let source = parse_language("source_lang", row.try_get::<&str, _>("source_lang").map_err(ser)?)?;
    let target = parse_language("target_lang", row.try_get::<&str, _>("target_lang").map_err(ser)?)?;

    Ok(VocabularyItem {
        id: ItemId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?),
        user_id: UserId::new(i64_to_u64("user_id", row.try_get("user_id").map_err(ser)?)?),
        pair: LanguagePair::new(source, target).map_err(ser)?,
        text: row.try_get("text").map_err(ser)?,
        translation: row.try_get("translation").map_err(ser)?,
        example: row.try_get("example").map_err(ser)?,
        phonetic: row.try_get("phonetic").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

/// Maps a `retention_states` row; the item id column is `item_id` unless aliased.
pub(crate) fn map_state_row(
    row: &SqliteRow,
    item_id_column: &str,
) -> Result<RetentionState, StorageError> {
    let last_reviewed_at: Option<DateTime<Utc>> = row.try_get("last_reviewed_at").map_err(ser)?;

    RetentionState::from_persisted(
        ItemId::new(i64_to_u64("item_id", row.try_get(item_id_column).map_err(ser)?)?),
        UserId::new(i64_to_u64("user_id", row.try_get("user_id").map_err(ser)?)?),
        i64_to_u32("interval_days", row.try_get("interval_days").map_err(ser)?)?,
        i64_to_u32("repetitions", row.try_get("repetitions").map_err(ser)?)?,
        row.try_get("easiness").map_err(ser)?,
        row.try_get("due_at").map_err(ser)?,
        last_reviewed_at,
    )
    .map_err(ser)
}

pub(crate) fn map_review_log_row(row: &SqliteRow) -> Result<ReviewLogRecord, StorageError> {
    let quality_raw: i64 = row.try_get("quality").map_err(ser)?;
    let quality = u8::try_from(quality_raw)
        .map_err(|_| StorageError::Serialization(format!("invalid quality: {quality_raw}")))
        .and_then(|q| Quality::new(q).map_err(ser))?;

    let response_time_ms = row
        .try_get::<Option<i64>, _>("response_time_ms")
        .map_err(ser)?
        .map(|ms| i64_to_u32("response_time_ms", ms))
        .transpose()?;

    let log = ReviewLog::new(
        ItemId::new(i64_to_u64("item_id", row.try_get("item_id").map_err(ser)?)?),
        quality,
        row.try_get("reviewed_at").map_err(ser)?,
    )
    .with_response_time(response_time_ms);

    Ok(ReviewLogRecord {
        id: row.try_get("id").map_err(ser)?,
        log,
    })
}

pub(crate) fn map_pair_stats_row(row: &SqliteRow) -> Result<PairStats, StorageError> {
    let source = parse_language("source_lang", row.try_get::<&str, _>("source_lang").map_err(ser)?)?;
    let target = parse_language("target_lang", row.try_get::<&str, _>("target_lang").map_err(ser)?)?;

    Ok(PairStats {
        pair: LanguagePair::new(source, target).map_err(ser)?,
        total: i64_to_u32("total", row.try_get("total").map_err(ser)?)?,
        learned: i64_to_u32("learned", row.try_get("learned").map_err(ser)?)?,
        due: i64_to_u32("due", row.try_get("due").map_err(ser)?)?,
    })
}
