//! Shared error types for the services crate.

use thiserror::Error;

use lexi_core::model::{ItemId, LanguageError, QualityError, VocabularyError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::sessions::SessionState;

/// Errors emitted by `ReviewService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReviewServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `VocabularyService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VocabularyServiceError {
    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),
    #[error("correction does not change any field")]
    EmptyCorrection,
    #[error("vocabulary item {0} not found")]
    NotFound(ItemId),
    #[error("an item with the same text already exists in this language pair")]
    Duplicate,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LearnService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LearnServiceError {
    #[error("vocabulary item {0} not found")]
    NotFound(ItemId),
    #[error(transparent)]
    Review(#[from] ReviewServiceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the review session state machine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// Malformed caller input, such as a quality outside `0..=5` or a zero queue limit.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cannot {operation} while the session is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: SessionState,
    },

    /// The record a session step depends on is gone.
    #[error("{0} not found")]
    NotFound(String),

    /// Storage failed; the session step can be retried.
    #[error("persistence failure: {0}")]
    Persistence(#[source] StorageError),
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => Self::NotFound("record".into()),
            other => Self::Persistence(other),
        }
    }
}

impl From<QualityError> for SessionError {
    fn from(err: QualityError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<LanguageError> for SessionError {
    fn from(err: LanguageError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
