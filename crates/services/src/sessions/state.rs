use std::fmt;

use lexi_core::model::ItemId;
use serde::Serialize;

/// Lifecycle of a review session.
///
/// `Presenting` and `Answered` alternate per card; `Complete` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// The current card is shown without its answer.
    Presenting,
    /// The answer is revealed and a rating is expected.
    Answered,
    Complete,
    Cancelled,
}

impl SessionState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Presenting => "presenting",
            Self::Answered => "answered",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CancelReason {
    UserRequested,
    /// The item under review was removed while the session was running.
    ItemMissing { item_id: ItemId },
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserRequested => f.write_str("cancelled by user"),
            Self::ItemMissing { item_id } => write!(f, "item {item_id} no longer exists"),
        }
    }
}
