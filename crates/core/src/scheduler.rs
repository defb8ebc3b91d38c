//! SM-2 (SuperMemo 2) scheduling.
//!
//! One fixed policy:
//! - easiness moves by `0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)` and never drops below 1.3
//! - quality below 3 is a lapse: the streak resets and the item comes back tomorrow
//! - passes grow the interval 1 day, then 6 days, then by the easiness factor

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::{MIN_EASINESS, Quality, QualityError, RetentionState, ReviewLog};

/// Interval after the first pass of a streak.
pub const FIRST_INTERVAL_DAYS: u32 = 1;
/// Interval after the second pass of a streak.
pub const SECOND_INTERVAL_DAYS: u32 = 6;
/// Interval after a lapse.
pub const LAPSE_INTERVAL_DAYS: u32 = 1;
/// Upper bound on any interval (about a century).
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchedulerError {
    #[error(transparent)]
    InvalidQuality(#[from] QualityError),
}

//
// ─── APPLIED REVIEW ────────────────────────────────────────────────────────────
//

/// Outcome of applying a rating: the successor state and the log entry for it.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedReview {
    pub state: RetentionState,
    pub log: ReviewLog,
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Stateless SM-2 transition function.
///
/// # Examples
///
/// ```
/// # use lexi_core::model::{ItemId, Quality, RetentionState, UserId};
/// # use lexi_core::scheduler::Scheduler;
/// let now = lexi_core::time::fixed_now();
/// let state = RetentionState::new(ItemId::new(1), UserId::new(1), now);
///
/// let next = Scheduler::new().next_state(&state, Quality::new(5)?, now);
/// assert_eq!(next.repetitions(), 1);
/// assert_eq!(next.interval_days(), 1);
/// assert_eq!(next.easiness(), 2.6);
/// # Ok::<(), lexi_core::model::QualityError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Scheduler;

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validates a raw quality value and computes the successor state.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidQuality` for values outside `0..=5`;
    /// nothing is computed in that case.
    pub fn review(
        &self,
        state: &RetentionState,
        quality: u8,
        now: DateTime<Utc>,
    ) -> Result<RetentionState, SchedulerError> {
        let quality = Quality::new(quality)?;
        Ok(self.next_state(state, quality, now))
    }

    /// Computes the successor of `state` for a rating given at `now`.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn next_state(
        &self,
        state: &RetentionState,
        quality: Quality,
        now: DateTime<Utc>,
    ) -> RetentionState {
        let easiness = next_easiness(state.easiness(), quality);

        let (repetitions, interval_days) = if quality.is_lapse() {
            (0, LAPSE_INTERVAL_DAYS)
        } else {
            let repetitions = state.repetitions().saturating_add(1);
            let interval = match repetitions {
                1 => FIRST_INTERVAL_DAYS,
                2 => SECOND_INTERVAL_DAYS,
                _ => grow_interval(state.interval_days(), easiness),
            };
            (repetitions, interval)
        };

        let due_at = now
            .checked_add_signed(Duration::days(i64::from(interval_days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        state.next(
            interval_days,
            repetitions,
            round_easiness(easiness),
            due_at,
            now,
        )
    }

    /// Computes the successor state together with its review log entry.
    #[must_use]
    pub fn apply_review(
        &self,
        state: &RetentionState,
        quality: Quality,
        now: DateTime<Utc>,
    ) -> AppliedReview {
        AppliedReview {
            state: self.next_state(state, quality, now),
            log: ReviewLog::new(state.item_id(), quality, now),
        }
    }
}

/// Easiness after a rating, clamped at [`MIN_EASINESS`].
#[must_use]
pub fn next_easiness(easiness: f64, quality: Quality) -> f64 {
    let miss = f64::from(Quality::MAX - quality.value());
    let raw = easiness + (0.1 - miss * (0.08 + miss * 0.02));
    raw.max(MIN_EASINESS)
}

// Stored easiness keeps two decimals so repeated reviews don't accumulate float noise.
fn round_easiness(easiness: f64) -> f64 {
    ((easiness * 100.0).round() / 100.0).max(MIN_EASINESS)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn grow_interval(interval_days: u32, easiness: f64) -> u32 {
    let grown = (f64::from(interval_days) * easiness).round();
    grown.clamp(1.0, f64::from(MAX_INTERVAL_DAYS)) as u32
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{INITIAL_EASINESS, ItemId, UserId};
    use crate::time::fixed_now;
    use proptest::prelude::*;

    fn q(value: u8) -> Quality {
        Quality::new(value).unwrap()
    }

    fn state(repetitions: u32, interval_days: u32, easiness: f64) -> RetentionState {
        let now = fixed_now();
        RetentionState::from_persisted(
            ItemId::new(1),
            UserId::new(1),
            interval_days,
            repetitions,
            easiness,
            now,
            None,
        )
        .unwrap()
    }

    #[test]
    fn new_item_perfect_recall() {
        let now = fixed_now();
        let fresh = RetentionState::new(ItemId::new(1), UserId::new(1), now);
        let next = Scheduler::new().next_state(&fresh, q(5), now);

        assert_eq!(next.repetitions(), 1);
        assert_eq!(next.interval_days(), 1);
        assert_eq!(next.easiness(), 2.6);
        assert_eq!(next.due_at(), now + Duration::days(1));
        assert_eq!(next.last_reviewed_at(), Some(now));
    }

    #[test]
    fn second_pass_schedules_six_days() {
        let next = Scheduler::new().next_state(&state(1, 1, 2.5), q(4), fixed_now());
        assert_eq!(next.repetitions(), 2);
        assert_eq!(next.interval_days(), 6);
    }

    #[test]
    fn third_pass_multiplies_by_easiness() {
        let next = Scheduler::new().next_state(&state(2, 6, 2.5), q(4), fixed_now());
        assert_eq!(next.repetitions(), 3);
        assert!((next.easiness() - 2.5).abs() < 1e-9);
        assert_eq!(next.interval_days(), 15);
        assert_eq!(next.due_at(), fixed_now() + Duration::days(15));
    }

    #[test]
    fn perfect_third_pass_uses_raised_easiness() {
        let next = Scheduler::new().next_state(&state(2, 6, 2.5), q(5), fixed_now());
        assert_eq!(next.interval_days(), 16);
        assert_eq!(next.easiness(), 2.6);
    }

    #[test]
    fn lapse_resets_streak_and_lowers_easiness() {
        let next = Scheduler::new().next_state(&state(5, 30, 2.0), q(1), fixed_now());
        assert_eq!(next.repetitions(), 0);
        assert_eq!(next.interval_days(), 1);
        assert_eq!(next.easiness(), 1.46);
        assert_eq!(next.due_at(), fixed_now() + Duration::days(1));
    }

    #[test]
    fn lapse_on_low_easiness_hits_floor() {
        let next = Scheduler::new().next_state(&state(3, 10, 1.5), q(0), fixed_now());
        assert_eq!(next.easiness(), MIN_EASINESS);
    }

    #[test]
    fn repeated_blackouts_stay_at_floor() {
        let scheduler = Scheduler::new();
        let mut now = fixed_now();
        let mut current = RetentionState::new(ItemId::new(1), UserId::new(1), now);
        for _ in 0..20 {
            current = scheduler.next_state(&current, q(0), now);
            assert!(current.easiness() >= MIN_EASINESS);
            now += Duration::days(1);
        }
        assert_eq!(current.easiness(), MIN_EASINESS);
    }

    #[test]
    fn quality_three_passes_with_easiness_penalty() {
        let next = Scheduler::new().next_state(&state(0, 0, INITIAL_EASINESS), q(3), fixed_now());
        assert_eq!(next.repetitions(), 1);
        assert_eq!(next.easiness(), 2.36);
    }

    #[test]
    fn zero_interval_streak_still_moves_forward() {
        let next = Scheduler::new().next_state(&state(2, 0, 2.5), q(5), fixed_now());
        assert_eq!(next.interval_days(), 1);
        assert!(next.due_at() > fixed_now());
    }

    #[test]
    fn interval_is_capped() {
        let next =
            Scheduler::new().next_state(&state(40, MAX_INTERVAL_DAYS, 3.0), q(5), fixed_now());
        assert_eq!(next.interval_days(), MAX_INTERVAL_DAYS);
    }

    #[test]
    fn review_rejects_out_of_range_quality() {
        let err = Scheduler::new()
            .review(&state(1, 1, 2.5), 6, fixed_now())
            .unwrap_err();
        assert_eq!(err, SchedulerError::InvalidQuality(QualityError::OutOfRange(6)));
    }

    #[test]
    fn apply_review_logs_the_rating() {
        let applied = Scheduler::new().apply_review(&state(0, 0, 2.5), q(4), fixed_now());
        assert_eq!(applied.log.item_id, ItemId::new(1));
        assert_eq!(applied.log.quality, q(4));
        assert_eq!(applied.log.reviewed_at, fixed_now());
        assert_eq!(applied.state.repetitions(), 1);
    }

    fn arb_state() -> impl Strategy<Value = RetentionState> {
        (0u32..50, 0u32..5_000, 1.3f64..4.0).prop_map(|(reps, interval, ef)| state(reps, interval, ef))
    }

    proptest! {
        #[test]
        fn pass_extends_streak(s in arb_state(), quality in 3u8..=5, offset in 0i64..10_000) {
            let now = fixed_now() + Duration::hours(offset);
            let next = Scheduler::new().next_state(&s, q(quality), now);
            prop_assert_eq!(next.repetitions(), s.repetitions() + 1);
            prop_assert!(next.easiness() >= MIN_EASINESS);
            prop_assert!(next.due_at() > now);
        }

        #[test]
        fn lapse_resets(s in arb_state(), quality in 0u8..3) {
            let next = Scheduler::new().next_state(&s, q(quality), fixed_now());
            prop_assert_eq!(next.repetitions(), 0);
            prop_assert_eq!(next.interval_days(), 1);
            prop_assert!(next.easiness() >= MIN_EASINESS);
        }

        #[test]
        fn transition_is_deterministic(s in arb_state(), quality in 0u8..=5) {
            let scheduler = Scheduler::new();
            let a = scheduler.next_state(&s, q(quality), fixed_now());
            let b = scheduler.next_state(&s, q(quality), fixed_now());
            prop_assert_eq!(a.easiness().to_bits(), b.easiness().to_bits());
            prop_assert_eq!(a, b);
        }

        #[test]
        fn due_never_precedes_review(s in arb_state(), quality in 0u8..=5) {
            let next = Scheduler::new().next_state(&s, q(quality), fixed_now());
            prop_assert!(next.due_at() >= fixed_now());
            prop_assert_eq!(next.last_reviewed_at(), Some(fixed_now()));
        }
    }
}
