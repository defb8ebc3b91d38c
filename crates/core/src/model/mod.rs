mod ids;
mod language;
mod quality;
mod retention;
mod review;
mod session;
mod vocabulary;

pub use ids::{ItemId, ParseIdError, SessionId, UserId};
pub use language::{Language, LanguageError, LanguagePair};
pub use quality::{LearnAction, Quality, QualityError, ReviewRating};
pub use retention::{INITIAL_EASINESS, MIN_EASINESS, RetentionError, RetentionState};
pub use review::ReviewLog;
pub use session::{SessionSummary, SummaryError};
pub use vocabulary::{
    ItemCorrection, MAX_PHONETIC_CHARS, MAX_TEXT_CHARS, ValidatedItem, VocabularyDraft,
    VocabularyError, VocabularyItem,
};
