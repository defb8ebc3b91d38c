use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{ItemId, UserId};

/// Easiness assigned to a freshly learned item.
pub const INITIAL_EASINESS: f64 = 2.5;
/// Lower bound of the easiness factor.
pub const MIN_EASINESS: f64 = 1.3;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum RetentionError {
    #[error("easiness must be a finite value >= 1.3, got {0}")]
    InvalidEasiness(f64),

    #[error("last review at {last_reviewed_at} is after due date {due_at}")]
    ReviewedAfterDue {
        last_reviewed_at: DateTime<Utc>,
        due_at: DateTime<Utc>,
    },
}

/// Spaced-repetition memory of one (user, item) pair.
///
/// Only [`crate::scheduler::Scheduler`] produces new values of this type
/// after creation; fields are read through accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionState {
    item_id: ItemId,
    user_id: UserId,
    interval_days: u32,
    repetitions: u32,
    easiness: f64,
    due_at: DateTime<Utc>,
    last_reviewed_at: Option<DateTime<Utc>>,
}

impl RetentionState {
    /// State created by the first successful learn action: due immediately.
    #[must_use]
    pub fn new(item_id: ItemId, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            item_id,
            user_id,
            interval_days: 0,
            repetitions: 0,
            easiness: INITIAL_EASINESS,
            due_at: now,
            last_reviewed_at: None,
        }
    }

    /// Rehydrate a state from storage.
    ///
    /// # Errors
    ///
    /// Returns `RetentionError::InvalidEasiness` below the floor or for non-finite values,
    /// and `RetentionError::ReviewedAfterDue` when the timestamps are inverted.
    pub fn from_persisted(
        item_id: ItemId,
        user_id: UserId,
        interval_days: u32,
        repetitions: u32,
        easiness: f64,
        due_at: DateTime<Utc>,
        last_reviewed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, RetentionError> {
        if !easiness.is_finite() || easiness < MIN_EASINESS {
            return Err(RetentionError::InvalidEasiness(easiness));
        }
        if let Some(last) = last_reviewed_at {
            if last > due_at {
                return Err(RetentionError::ReviewedAfterDue {
                    last_reviewed_at: last,
                    due_at,
                });
            }
        }
        Ok(Self {
            item_id,
            user_id,
            interval_days,
            repetitions,
            easiness,
            due_at,
            last_reviewed_at,
        })
    }

    /// Successor state; visible to the scheduler only.
    pub(crate) fn next(
        &self,
        interval_days: u32,
        repetitions: u32,
        easiness: f64,
        due_at: DateTime<Utc>,
        reviewed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            item_id: self.item_id,
            user_id: self.user_id,
            interval_days,
            repetitions,
            easiness,
            due_at,
            last_reviewed_at: Some(reviewed_at),
        }
    }

    #[must_use]
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn interval_days(&self) -> u32 {
        self.interval_days
    }

    #[must_use]
    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    #[must_use]
    pub fn easiness(&self) -> f64 {
        self.easiness
    }

    #[must_use]
    pub fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    #[must_use]
    pub fn last_reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.last_reviewed_at
    }

    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }

    #[must_use]
    pub fn is_new(&self) -> bool {
        self.last_reviewed_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn new_state_uses_defaults_and_is_due() {
        let now = fixed_now();
        let state = RetentionState::new(ItemId::new(1), UserId::new(2), now);
        assert_eq!(state.repetitions(), 0);
        assert_eq!(state.interval_days(), 0);
        assert_eq!(state.easiness(), INITIAL_EASINESS);
        assert!(state.is_due(now));
        assert!(state.is_new());
    }

    #[test]
    fn persisted_state_enforces_easiness_floor() {
        let now = fixed_now();
        let err = RetentionState::from_persisted(
            ItemId::new(1),
            UserId::new(1),
            1,
            1,
            1.2,
            now,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, RetentionError::InvalidEasiness(_)));

        assert!(matches!(
            RetentionState::from_persisted(ItemId::new(1), UserId::new(1), 1, 1, f64::NAN, now, None),
            Err(RetentionError::InvalidEasiness(_))
        ));
    }

    #[test]
    fn persisted_state_rejects_review_after_due() {
        let now = fixed_now();
        let err = RetentionState::from_persisted(
            ItemId::new(1),
            UserId::new(1),
            1,
            1,
            2.5,
            now,
            Some(now + Duration::days(1)),
        )
        .unwrap_err();
        assert!(matches!(err, RetentionError::ReviewedAfterDue { .. }));
    }

    #[test]
    fn not_due_before_due_at() {
        let now = fixed_now();
        let state = RetentionState::from_persisted(
            ItemId::new(1),
            UserId::new(1),
            6,
            2,
            2.5,
            now + Duration::days(6),
            Some(now),
        )
        .unwrap();
        assert!(!state.is_due(now));
        assert!(state.is_due(now + Duration::days(6)));
    }
}
