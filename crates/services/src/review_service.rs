use chrono::{DateTime, Utc};

use lexi_core::{
    model::{Quality, RetentionState},
    scheduler::{AppliedReview, Scheduler},
    time::Clock,
};
use storage::repository::ReviewPersistence;

pub use crate::error::ReviewServiceError;

/// Result of a persisted review: the applied transition and the stored log id.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedReview {
    pub applied: AppliedReview,
    pub log_id: i64,
}

impl PersistedReview {
    #[must_use]
    pub fn state(&self) -> &RetentionState {
        &self.applied.state
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Coordinates applying a rating to a retention state using the scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewService {
    clock: Clock,
    scheduler: Scheduler,
}

impl ReviewService {
    /// Review service with the SM-2 scheduler and the real-time clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Apply a rating and persist the new state together with its log entry.
    ///
    /// The caller's `state` is left untouched; on failure nothing has been written.
    ///
    /// # Errors
    ///
    /// Returns storage errors if the atomic commit fails.
    pub async fn review_state_persisted(
        &self,
        state: &RetentionState,
        quality: Quality,
        reviewed_at: DateTime<Utc>,
        response_time_ms: Option<u32>,
        reviews: &dyn ReviewPersistence,
    ) -> Result<PersistedReview, ReviewServiceError> {
        let mut applied = self.scheduler.apply_review(state, quality, reviewed_at);
        applied.log = applied.log.with_response_time(response_time_ms);

        tracing::debug!(
            item_id = %state.item_id(),
            quality = quality.value(),
            repetitions = applied.state.repetitions(),
            interval_days = applied.state.interval_days(),
            easiness = applied.state.easiness(),
            "scheduler transition"
        );

        let log_id = reviews.commit_review(&applied.state, &applied.log).await?;
        Ok(PersistedReview { applied, log_id })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
