use std::sync::Arc;

use lexi_core::model::{LanguagePair, Quality, SessionSummary, UserId};
use storage::repository::{RetentionRepository, ReviewPersistence, StorageError};

use super::plan::ReviewFilter;
use super::service::ReviewSession;
use super::state::{CancelReason, SessionState};
use super::view::CardView;
use crate::Clock;
use crate::error::{ReviewServiceError, SessionError};
use crate::review_service::ReviewService;

/// Result of `start_session`.
#[derive(Debug)]
pub enum SessionStart {
    Started(ReviewSession),
    /// Nothing is due for the filter; no session was opened.
    Empty,
}

/// Result of rating the current card.
#[derive(Debug, Clone, PartialEq)]
pub enum RateOutcome {
    Next(CardView),
    Finished(SessionSummary),
}

/// Orchestrates review sessions: queue loading, per-rating persistence, and cancellation.
///
/// Holds no per-session state; every operation takes the caller's [`ReviewSession`].
#[derive(Clone)]
pub struct ReviewSessionManager {
    clock: Clock,
    review: ReviewService,
    retention: Arc<dyn RetentionRepository>,
    reviews: Arc<dyn ReviewPersistence>,
}

impl ReviewSessionManager {
    #[must_use]
    pub fn new(
        clock: Clock,
        retention: Arc<dyn RetentionRepository>,
        reviews: Arc<dyn ReviewPersistence>,
    ) -> Self {
        Self {
            clock,
            review: ReviewService::new().with_clock(clock),
            retention,
            reviews,
        }
    }

    /// Load the due queue and open a session on it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` for a malformed filter and
    /// `SessionError::Persistence` if the queue cannot be loaded.
    pub async fn start_session(
        &self,
        user_id: UserId,
        filter: ReviewFilter,
    ) -> Result<SessionStart, SessionError> {
        filter.validate()?;
        let now = self.clock.now();
        let queue = self
            .retention
            .load_due(&filter.due_query(user_id, now))
            .await
            .map_err(SessionError::Persistence)?;
        tracing::debug!(user_id = %user_id, due = queue.len(), "loaded review queue");

        match ReviewSession::start(user_id, queue, now) {
            Some(session) => {
                tracing::info!(
                    user_id = %user_id,
                    session_id = %session.id(),
                    total = session.progress().total,
                    "review session started"
                );
                Ok(SessionStart::Started(session))
            }
            None => Ok(SessionStart::Empty),
        }
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` once the session has ended.
    pub fn current_card(&self, session: &ReviewSession) -> Result<CardView, SessionError> {
        session.current_card()
    }

    /// Show the answer of the current card. Calling it again is harmless.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` once the session has ended.
    pub fn reveal(&self, session: &mut ReviewSession) -> Result<CardView, SessionError> {
        session.reveal()
    }

    /// Rate the revealed card on the `0..=5` quality axis.
    ///
    /// # Errors
    ///
    /// See [`Self::rate_timed`].
    pub async fn rate(
        &self,
        session: &mut ReviewSession,
        quality: u8,
    ) -> Result<RateOutcome, SessionError> {
        self.rate_timed(session, quality, None).await
    }

    /// Rate the revealed card, recording how long the learner took to answer.
    ///
    /// The new retention state is committed before the session advances. If the
    /// commit fails the session stays `Answered` on the same card so the rating can
    /// be retried.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidTransition` unless the card was revealed.
    /// - `SessionError::InvalidInput` for a quality outside `0..=5`.
    /// - `SessionError::NotFound` if the item was removed; the session is cancelled.
    /// - `SessionError::Persistence` if storage rejects the write.
    pub async fn rate_timed(
        &self,
        session: &mut ReviewSession,
        quality: u8,
        response_time_ms: Option<u32>,
    ) -> Result<RateOutcome, SessionError> {
        let state = session.awaiting_rating()?.clone();
        let quality = Quality::new(quality)?;
        let now = self.clock.now();

        let committed = match self
            .review
            .review_state_persisted(
                &state,
                quality,
                now,
                response_time_ms,
                self.reviews.as_ref(),
            )
            .await
        {
            Ok(persisted) => persisted.applied.state,
            Err(ReviewServiceError::Storage(StorageError::NotFound)) => {
                let item_id = state.item_id();
                session.cancel(CancelReason::ItemMissing { item_id }, now)?;
                tracing::warn!(
                    session_id = %session.id(),
                    item_id = %item_id,
                    "item disappeared during review; session cancelled"
                );
                return Err(SessionError::NotFound(format!("vocabulary item {item_id}")));
            }
            Err(ReviewServiceError::Storage(err)) => {
                tracing::warn!(
                    session_id = %session.id(),
                    item_id = %state.item_id(),
                    error = %err,
                    "failed to commit rating; session left answerable"
                );
                return Err(SessionError::Persistence(err));
            }
        };

        session.record_rating(quality, committed, now);

        if session.state() == SessionState::Complete {
            let summary = session.summary().ok_or(SessionError::InvalidTransition {
                operation: "summarize",
                state: session.state(),
            })?;
            tracing::info!(
                session_id = %session.id(),
                reviewed = summary.reviewed_count(),
                average = summary.average_rating(),
                "review session complete"
            );
            return Ok(RateOutcome::Finished(summary));
        }

        Ok(RateOutcome::Next(session.current_card()?))
    }

    /// End the session early. Ratings already given stay committed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` if the session already ended.
    pub fn cancel(&self, session: &mut ReviewSession) -> Result<SessionSummary, SessionError> {
        session.cancel(CancelReason::UserRequested, self.clock.now())?;
        tracing::info!(
            session_id = %session.id(),
            reviewed = session.reviewed_count(),
            "review session cancelled"
        );
        session.summary().ok_or(SessionError::InvalidTransition {
            operation: "summarize",
            state: session.state(),
        })
    }

    /// Number of items due now for the user.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Persistence` if storage cannot be queried.
    pub async fn count_due(
        &self,
        user_id: UserId,
        pair: Option<LanguagePair>,
    ) -> Result<u32, SessionError> {
        self.retention
            .count_due(user_id, pair, self.clock.now())
            .await
            .map_err(SessionError::Persistence)
    }
}
