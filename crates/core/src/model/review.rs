use chrono::{DateTime, Utc};

use crate::model::ids::ItemId;
use crate::model::quality::Quality;

/// Record of a single rating event, kept for history and analytics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewLog {
    pub item_id: ItemId,
    pub quality: Quality,
    pub reviewed_at: DateTime<Utc>,
    pub response_time_ms: Option<u32>,
}

impl ReviewLog {
    #[must_use]
    pub fn new(item_id: ItemId, quality: Quality, reviewed_at: DateTime<Utc>) -> Self {
        Self {
            item_id,
            quality,
            reviewed_at,
            response_time_ms: None,
        }
    }

    #[must_use]
    pub fn with_response_time(mut self, response_time_ms: Option<u32>) -> Self {
        self.response_time_ms = response_time_ms;
        self
    }
}
