use serde::Serialize;

/// Aggregated view of session progress, for "card 3 of 20" headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    /// 1-based position of the current card; equals `total` once nothing is left.
    pub position: usize,
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
}
