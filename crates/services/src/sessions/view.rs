use lexi_core::model::{ItemId, LanguagePair, VocabularyItem};
use serde::Serialize;

use super::progress::SessionProgress;

/// The card a session is currently showing.
///
/// Presentation-agnostic: no pre-formatted strings. The translation stays hidden
/// until the card is revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub item: VocabularyItem,
    pub is_answer_revealed: bool,
    pub progress: SessionProgress,
}

impl CardView {
    #[must_use]
    pub fn item_id(&self) -> ItemId {
        self.item.id
    }

    #[must_use]
    pub fn pair(&self) -> LanguagePair {
        self.item.pair
    }

    /// Prompt side of the card.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.item.text
    }

    #[must_use]
    pub fn phonetic(&self) -> Option<&str> {
        self.item.phonetic.as_deref()
    }

    /// Translation, only once the card has been revealed.
    #[must_use]
    pub fn answer(&self) -> Option<&str> {
        self.is_answer_revealed
            .then_some(self.item.translation.as_str())
    }

    /// Example sentence, shown with the answer.
    #[must_use]
    pub fn example(&self) -> Option<&str> {
        if self.is_answer_revealed {
            self.item.example.as_deref()
        } else {
            None
        }
    }
}
