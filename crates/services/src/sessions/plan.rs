use chrono::{DateTime, Utc};
use lexi_core::model::{LanguagePair, UserId};
use storage::repository::DueQuery;

use crate::error::SessionError;

/// Queue size used by front ends that do not pick one.
pub const DEFAULT_SESSION_LIMIT: u32 = 20;

/// Which due items a session draws from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    pub pair: Option<LanguagePair>,
    pub limit: Option<u32>,
}

impl ReviewFilter {
    /// All due items, no cap.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_pair(mut self, pair: LanguagePair) -> Self {
        self.pair = Some(pair);
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Parses an optional pair string such as `en-ru`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` for malformed pairs.
    pub fn parse(pair: Option<&str>, limit: Option<u32>) -> Result<Self, SessionError> {
        let pair = pair.map(str::parse::<LanguagePair>).transpose()?;
        let filter = Self { pair, limit };
        filter.validate()?;
        Ok(filter)
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` for a zero limit.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.limit == Some(0) {
            return Err(SessionError::InvalidInput(
                "session limit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn due_query(&self, user_id: UserId, now: DateTime<Utc>) -> DueQuery {
        DueQuery::new(user_id, now)
            .with_pair(self.pair)
            .with_limit(self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexi_core::time::fixed_now;

    #[test]
    fn parse_accepts_pair_and_limit() {
        let filter = ReviewFilter::parse(Some("en_ru"), Some(DEFAULT_SESSION_LIMIT)).unwrap();
        assert_eq!(filter.pair, Some("en-ru".parse().unwrap()));

        let query = filter.due_query(UserId::new(3), fixed_now());
        assert_eq!(query.user_id, UserId::new(3));
        assert_eq!(query.limit, Some(20));
        assert_eq!(query.now, fixed_now());
    }

    #[test]
    fn malformed_filters_are_invalid_input() {
        assert!(matches!(
            ReviewFilter::parse(Some("en-en"), None),
            Err(SessionError::InvalidInput(_))
        ));
        assert!(matches!(
            ReviewFilter::parse(Some("english"), None),
            Err(SessionError::InvalidInput(_))
        ));
        assert!(matches!(
            ReviewFilter::all().with_limit(0).validate(),
            Err(SessionError::InvalidInput(_))
        ));
    }
}
