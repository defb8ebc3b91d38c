use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::learn_service::LearnService;
use crate::sessions::ReviewSessionManager;
use crate::vocabulary_service::VocabularyService;

/// Assembles front-end-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    vocabulary: Arc<VocabularyService>,
    learn: Arc<LearnService>,
    sessions: Arc<ReviewSessionManager>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let vocabulary = Arc::new(VocabularyService::new(
            clock,
            Arc::clone(&storage.vocabulary),
            Arc::clone(&storage.review_logs),
        ));
        let learn = Arc::new(LearnService::new(
            clock,
            Arc::clone(&storage.vocabulary),
            Arc::clone(&storage.retention),
            Arc::clone(&storage.reviews),
        ));
        let sessions = Arc::new(ReviewSessionManager::new(
            clock,
            Arc::clone(&storage.retention),
            Arc::clone(&storage.reviews),
        ));

        Self {
            vocabulary,
            learn,
            sessions,
        }
    }

    #[must_use]
    pub fn vocabulary(&self) -> Arc<VocabularyService> {
        Arc::clone(&self.vocabulary)
    }

    #[must_use]
    pub fn learn(&self) -> Arc<LearnService> {
        Arc::clone(&self.learn)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<ReviewSessionManager> {
        Arc::clone(&self.sessions)
    }
}
