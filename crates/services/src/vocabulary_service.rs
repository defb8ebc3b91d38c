use std::sync::Arc;

use lexi_core::model::{
    ItemCorrection, ItemId, LanguagePair, UserId, VocabularyDraft, VocabularyItem,
};
use storage::repository::{
    PairStats, ReviewLogRecord, ReviewLogRepository, StorageError, VocabularyRepository,
};

use crate::Clock;
use crate::error::VocabularyServiceError;

/// Manages a user's vocabulary collection.
#[derive(Clone)]
pub struct VocabularyService {
    clock: Clock,
    items: Arc<dyn VocabularyRepository>,
    review_logs: Arc<dyn ReviewLogRepository>,
}

impl VocabularyService {
    #[must_use]
    pub fn new(
        clock: Clock,
        items: Arc<dyn VocabularyRepository>,
        review_logs: Arc<dyn ReviewLogRepository>,
    ) -> Self {
        Self {
            clock,
            items,
            review_logs,
        }
    }

    /// Validate and store a new item. The item has no retention state until it is learned.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyServiceError::Vocabulary` for validation failures,
    /// `VocabularyServiceError::Duplicate` if the text already exists in the pair,
    /// and `VocabularyServiceError::Storage` if persistence fails.
    pub async fn add_item(
        &self,
        draft: VocabularyDraft,
    ) -> Result<VocabularyItem, VocabularyServiceError> {
        let validated = draft.validate(self.clock.now())?;
        let item = self
            .items
            .insert_item(validated)
            .await
            .map_err(duplicate_or_storage)?;
        tracing::info!(item_id = %item.id, user_id = %item.user_id, pair = %item.pair, "vocabulary item added");
        Ok(item)
    }

    /// Apply a corrective edit to an existing item.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyServiceError::EmptyCorrection` when nothing would change,
    /// `VocabularyServiceError::NotFound` for unknown items, validation and duplicate
    /// errors as for [`Self::add_item`].
    pub async fn correct_item(
        &self,
        item_id: ItemId,
        correction: ItemCorrection,
    ) -> Result<VocabularyItem, VocabularyServiceError> {
        if correction.is_empty() {
            return Err(VocabularyServiceError::EmptyCorrection);
        }

        let mut item = self
            .items
            .get_item(item_id)
            .await?
            .ok_or(VocabularyServiceError::NotFound(item_id))?;
        item.correct(correction)?;

        self.items.update_item(&item).await.map_err(|err| match err {
            StorageError::NotFound => VocabularyServiceError::NotFound(item_id),
            other => duplicate_or_storage(other),
        })?;
        Ok(item)
    }

    /// Remove an item from the collection along with its retention state and history.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyServiceError::NotFound` for unknown items and
    /// `VocabularyServiceError::Storage` if persistence fails.
    pub async fn remove_item(&self, item_id: ItemId) -> Result<(), VocabularyServiceError> {
        self.items.delete_item(item_id).await.map_err(|err| match err {
            StorageError::NotFound => VocabularyServiceError::NotFound(item_id),
            other => VocabularyServiceError::Storage(other),
        })?;
        tracing::info!(item_id = %item_id, "vocabulary item removed");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `VocabularyServiceError::Storage` if repository access fails.
    pub async fn get_item(
        &self,
        item_id: ItemId,
    ) -> Result<Option<VocabularyItem>, VocabularyServiceError> {
        Ok(self.items.get_item(item_id).await?)
    }

    /// Items of a user in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyServiceError::Storage` if repository access fails.
    pub async fn list_items(
        &self,
        user_id: UserId,
        pair: Option<LanguagePair>,
    ) -> Result<Vec<VocabularyItem>, VocabularyServiceError> {
        Ok(self.items.list_items(user_id, pair).await?)
    }

    /// Review history of an item, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyServiceError::NotFound` for unknown items and
    /// `VocabularyServiceError::Storage` if repository access fails.
    pub async fn history(
        &self,
        item_id: ItemId,
    ) -> Result<Vec<ReviewLogRecord>, VocabularyServiceError> {
        if self.items.get_item(item_id).await?.is_none() {
            return Err(VocabularyServiceError::NotFound(item_id));
        }
        Ok(self.review_logs.logs_for_item(item_id).await?)
    }

    /// Learned, unlearned and due counts per language pair, as of now.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyServiceError::Storage` if repository access fails.
    pub async fn stats(&self, user_id: UserId) -> Result<Vec<PairStats>, VocabularyServiceError> {
        Ok(self.items.pair_stats(user_id, self.clock.now()).await?)
    }
}

fn duplicate_or_storage(err: StorageError) -> VocabularyServiceError {
    match err {
        StorageError::Conflict => VocabularyServiceError::Duplicate,
        other => VocabularyServiceError::Storage(other),
    }
}
