use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::UserId;
use crate::model::quality::Quality;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("rating sum {sum} is impossible for {count} reviews")]
    RatingSumOutOfRange { count: u32, sum: u32 },
}

/// Aggregates of a finished or cancelled review session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    user_id: UserId,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    reviewed_count: u32,
    rating_sum: u32,
}

impl SessionSummary {
    /// # Errors
    ///
    /// Returns `SummaryError::InvalidTimeRange` if `completed_at < started_at`, and
    /// `SummaryError::RatingSumOutOfRange` if the sum exceeds five per review.
    pub fn new(
        user_id: UserId,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        reviewed_count: u32,
        rating_sum: u32,
    ) -> Result<Self, SummaryError> {
        if completed_at < started_at {
            return Err(SummaryError::InvalidTimeRange);
        }
        if u64::from(rating_sum) > u64::from(reviewed_count) * u64::from(Quality::MAX) {
            return Err(SummaryError::RatingSumOutOfRange {
                count: reviewed_count,
                sum: rating_sum,
            });
        }
        Ok(Self {
            user_id,
            started_at,
            completed_at,
            reviewed_count,
            rating_sum,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn reviewed_count(&self) -> u32 {
        self.reviewed_count
    }

    #[must_use]
    pub fn rating_sum(&self) -> u32 {
        self.rating_sum
    }

    /// `rating_sum / reviewed_count`, or `0.0` when nothing was rated.
    #[must_use]
    pub fn average_rating(&self) -> f64 {
        if self.reviewed_count == 0 {
            return 0.0;
        }
        f64::from(self.rating_sum) / f64::from(self.reviewed_count)
    }

    /// Average rounded to one decimal place, as shown to learners.
    #[must_use]
    pub fn average_rating_display(&self) -> f64 {
        (self.average_rating() * 10.0).round() / 10.0
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.completed_at - self.started_at
    }

    /// Elapsed time in whole minutes, never less than one.
    #[must_use]
    pub fn elapsed_minutes(&self) -> i64 {
        self.elapsed().num_minutes().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn average_and_elapsed() {
        let start = fixed_now();
        let summary =
            SessionSummary::new(UserId::new(1), start, start + Duration::seconds(150), 3, 11)
                .unwrap();
        assert!((summary.average_rating() - 11.0 / 3.0).abs() < f64::EPSILON);
        assert!((summary.average_rating_display() - 3.7).abs() < 1e-9);
        assert_eq!(summary.elapsed(), Duration::seconds(150));
        assert_eq!(summary.elapsed_minutes(), 2);
    }

    #[test]
    fn empty_summary_has_zero_average_and_one_minute() {
        let start = fixed_now();
        let summary = SessionSummary::new(UserId::new(1), start, start, 0, 0).unwrap();
        assert_eq!(summary.average_rating(), 0.0);
        assert_eq!(summary.elapsed_minutes(), 1);
    }

    #[test]
    fn rejects_inverted_range_and_impossible_sum() {
        let start = fixed_now();
        assert_eq!(
            SessionSummary::new(UserId::new(1), start, start - Duration::seconds(1), 0, 0),
            Err(SummaryError::InvalidTimeRange)
        );
        assert_eq!(
            SessionSummary::new(UserId::new(1), start, start, 2, 11),
            Err(SummaryError::RatingSumOutOfRange { count: 2, sum: 11 })
        );
    }
}
