use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QualityError {
    #[error("quality must be between 0 and 5, got {0}")]
    OutOfRange(u8),

    #[error("review rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("unknown learn action: {0}")]
    UnknownAction(String),
}

//
// ─── QUALITY ───────────────────────────────────────────────────────────────────
//

/// Recall quality on the SM-2 axis, `0..=5`.
///
/// `0` is a complete blackout, `5` a perfect response. Anything below
/// [`Quality::PASSING`] is a lapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 5;
    pub const PASSING: u8 = 3;

    /// # Errors
    ///
    /// Returns `QualityError::OutOfRange` for values above 5.
    pub fn new(value: u8) -> Result<Self, QualityError> {
        if value > Self::MAX {
            return Err(QualityError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_pass(self) -> bool {
        self.0 >= Self::PASSING
    }

    #[must_use]
    pub fn is_lapse(self) -> bool {
        !self.is_pass()
    }
}

impl TryFrom<u8> for Quality {
    type Error = QualityError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── REVIEW RATING (1–5 buttons) ───────────────────────────────────────────────
//

/// The five-button scale shown during formal review.
///
/// `1` means "forgot", `5` "perfect recall"; 1 and 2 are lapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReviewRating(u8);

impl ReviewRating {
    /// # Errors
    ///
    /// Returns `QualityError::InvalidRating` outside `1..=5`.
    pub fn new(value: u8) -> Result<Self, QualityError> {
        if !(1..=5).contains(&value) {
            return Err(QualityError::InvalidRating(value));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Review buttons sit directly on the quality axis.
    #[must_use]
    pub fn to_quality(self) -> Quality {
        Quality(self.0)
    }
}

//
// ─── LEARN ACTION (3 buttons) ──────────────────────────────────────────────────
//

/// Buttons offered while first learning a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearnAction {
    Know,
    Hard,
    Forgot,
}

impl LearnAction {
    #[must_use]
    pub fn to_quality(self) -> Quality {
        match self {
            LearnAction::Know => Quality(5),
            LearnAction::Hard => Quality(3),
            LearnAction::Forgot => Quality(1),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LearnAction::Know => "know",
            LearnAction::Hard => "hard",
            LearnAction::Forgot => "forgot",
        }
    }
}

impl std::str::FromStr for LearnAction {
    type Err = QualityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "know" => Ok(LearnAction::Know),
            "hard" => Ok(LearnAction::Hard),
            "forgot" => Ok(LearnAction::Forgot),
            other => Err(QualityError::UnknownAction(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_range_is_enforced() {
        assert_eq!(Quality::new(0).unwrap().value(), 0);
        assert_eq!(Quality::new(5).unwrap().value(), 5);
        assert_eq!(Quality::new(6).unwrap_err(), QualityError::OutOfRange(6));
    }

    #[test]
    fn passing_threshold_is_three() {
        assert!(Quality::new(2).unwrap().is_lapse());
        assert!(Quality::new(3).unwrap().is_pass());
    }

    #[test]
    fn review_rating_maps_onto_quality() {
        assert_eq!(ReviewRating::new(1).unwrap().to_quality(), Quality(1));
        assert_eq!(ReviewRating::new(5).unwrap().to_quality(), Quality(5));
        assert!(matches!(
            ReviewRating::new(0),
            Err(QualityError::InvalidRating(0))
        ));
    }

    #[test]
    fn learn_actions_split_pass_and_lapse() {
        assert!(LearnAction::Know.to_quality().is_pass());
        assert!(LearnAction::Hard.to_quality().is_pass());
        assert!(LearnAction::Forgot.to_quality().is_lapse());
        assert_eq!("Hard".parse::<LearnAction>().unwrap(), LearnAction::Hard);
    }
}
