use std::sync::Arc;

use lexi_core::model::{ItemId, LanguagePair, LearnAction, RetentionState, UserId, VocabularyItem};
use storage::repository::{
    ReviewPersistence, RetentionRepository, StorageError, VocabularyRepository,
};

use crate::Clock;
use crate::error::LearnServiceError;
use crate::review_service::{PersistedReview, ReviewService};

/// What a learn action did to an item.
#[derive(Debug, Clone, PartialEq)]
pub enum LearnOutcome {
    /// First successful learn: the item entered the review rotation, due now.
    Learned(RetentionState),
    /// The item was already learned; the action was scheduled like a review.
    Reviewed(PersistedReview),
    /// Not learned yet and not known; nothing was stored.
    Skipped,
}

/// First-pass learning flow (know / hard / forgot buttons).
#[derive(Clone)]
pub struct LearnService {
    clock: Clock,
    review: ReviewService,
    items: Arc<dyn VocabularyRepository>,
    retention: Arc<dyn RetentionRepository>,
    reviews: Arc<dyn ReviewPersistence>,
}

impl LearnService {
    #[must_use]
    pub fn new(
        clock: Clock,
        items: Arc<dyn VocabularyRepository>,
        retention: Arc<dyn RetentionRepository>,
        reviews: Arc<dyn ReviewPersistence>,
    ) -> Self {
        Self {
            clock,
            review: ReviewService::new().with_clock(clock),
            items,
            retention,
            reviews,
        }
    }

    /// Items without retention state, oldest first, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns `LearnServiceError::Storage` if repository access fails.
    pub async fn unlearned_items(
        &self,
        user_id: UserId,
        pair: Option<LanguagePair>,
        limit: u32,
    ) -> Result<Vec<VocabularyItem>, LearnServiceError> {
        Ok(self.items.list_unlearned(user_id, pair, Some(limit)).await?)
    }

    /// Apply a learn button to an item.
    ///
    /// # Errors
    ///
    /// Returns `LearnServiceError::NotFound` for unknown items and storage errors otherwise.
    pub async fn apply(
        &self,
        item_id: ItemId,
        action: LearnAction,
    ) -> Result<LearnOutcome, LearnServiceError> {
        let item = self
            .items
            .get_item(item_id)
            .await?
            .ok_or(LearnServiceError::NotFound(item_id))?;
        let now = self.clock.now();

        match self.retention.get_state(item.id).await? {
            Some(state) => {
                let persisted = self
                    .review
                    .review_state_persisted(
                        &state,
                        action.to_quality(),
                        now,
                        None,
                        self.reviews.as_ref(),
                    )
                    .await?;
                tracing::debug!(item_id = %item.id, action = action.as_str(), "learn action rescheduled item");
                Ok(LearnOutcome::Reviewed(persisted))
            }
            None if action == LearnAction::Know => {
                let fresh = RetentionState::new(item.id, item.user_id, now);
                let state = match self.retention.insert_state(&fresh).await {
                    Ok(()) => fresh,
                    // Learned concurrently from another device; keep the existing state.
                    Err(StorageError::Conflict) => self
                        .retention
                        .get_state(item.id)
                        .await?
                        .ok_or(LearnServiceError::NotFound(item_id))?,
                    Err(StorageError::NotFound) => return Err(LearnServiceError::NotFound(item_id)),
                    Err(other) => return Err(other.into()),
                };
                tracing::info!(item_id = %item.id, user_id = %item.user_id, "item learned");
                Ok(LearnOutcome::Learned(state))
            }
            None => Ok(LearnOutcome::Skipped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexi_core::model::{INITIAL_EASINESS, VocabularyDraft};
    use lexi_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    async fn setup() -> (LearnService, InMemoryRepository, VocabularyItem) {
        let repo = InMemoryRepository::new();
        let item = repo
            .insert_item(
                VocabularyDraft::new(UserId::new(1), "en-ru".parse().unwrap(), "dog", "собака")
                    .validate(fixed_now())
                    .unwrap(),
            )
            .await
            .unwrap();
        let svc = LearnService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        (svc, repo, item)
    }

    #[tokio::test]
    async fn know_creates_default_state_due_now() {
        let (svc, repo, item) = setup().await;
        let outcome = svc.apply(item.id, LearnAction::Know).await.unwrap();

        let LearnOutcome::Learned(state) = outcome else {
            panic!("expected Learned, got {outcome:?}");
        };
        assert_eq!(state.repetitions(), 0);
        assert_eq!(state.interval_days(), 0);
        assert_eq!(state.easiness(), INITIAL_EASINESS);
        assert_eq!(state.due_at(), fixed_now());
        assert_eq!(repo.get_state(item.id).await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn hard_and_forgot_leave_new_items_unlearned() {
        let (svc, repo, item) = setup().await;
        for action in [LearnAction::Hard, LearnAction::Forgot] {
            assert_eq!(
                svc.apply(item.id, action).await.unwrap(),
                LearnOutcome::Skipped
            );
        }
        assert_eq!(repo.get_state(item.id).await.unwrap(), None);
        assert_eq!(
            svc.unlearned_items(UserId::new(1), None, 10).await.unwrap(),
            vec![item]
        );
    }

    #[tokio::test]
    async fn actions_on_learned_items_go_through_scheduler() {
        let (svc, repo, item) = setup().await;
        svc.apply(item.id, LearnAction::Know).await.unwrap();

        let outcome = svc.apply(item.id, LearnAction::Forgot).await.unwrap();
        let LearnOutcome::Reviewed(persisted) = outcome else {
            panic!("expected Reviewed, got {outcome:?}");
        };
        assert_eq!(persisted.state().repetitions(), 0);
        assert_eq!(persisted.state().interval_days(), 1);
        assert!(persisted.state().easiness() < INITIAL_EASINESS);
        assert!(svc.unlearned_items(UserId::new(1), None, 10).await.unwrap().is_empty());
        assert_eq!(
            repo.get_state(item.id).await.unwrap().as_ref(),
            Some(persisted.state())
        );
    }

    #[tokio::test]
    async fn unlearned_items_respect_limit_and_order() {
        let (svc, repo, first) = setup().await;
        let mut later = Vec::new();
        for (offset, text) in [(1, "cat"), (2, "owl")] {
            let item = repo
                .insert_item(
                    VocabularyDraft::new(UserId::new(1), "en-ru".parse().unwrap(), text, "t")
                        .validate(fixed_now() + chrono::Duration::seconds(offset))
                        .unwrap(),
                )
                .await
                .unwrap();
            later.push(item);
        }
        svc.apply(first.id, LearnAction::Know).await.unwrap();

        assert_eq!(
            svc.unlearned_items(UserId::new(1), None, 1).await.unwrap(),
            vec![later[0].clone()]
        );
        assert_eq!(
            svc.unlearned_items(UserId::new(1), None, 10).await.unwrap(),
            later
        );
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let (svc, _repo, _item) = setup().await;
        assert!(matches!(
            svc.apply(ItemId::new(404), LearnAction::Know).await,
            Err(LearnServiceError::NotFound(_))
        ));
    }
}
