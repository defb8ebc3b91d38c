use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ItemId, UserId};
use crate::model::language::LanguagePair;

/// Longest accepted source text or translation, in characters.
pub const MAX_TEXT_CHARS: usize = 255;
/// Longest accepted phonetic hint, in characters.
pub const MAX_PHONETIC_CHARS: usize = 100;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VocabularyError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} is longer than {max} characters")]
    TooLong { field: &'static str, max: usize },
}

fn required(field: &'static str, raw: String, max: usize) -> Result<String, VocabularyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(VocabularyError::Empty { field });
    }
    if trimmed.chars().count() > max {
        return Err(VocabularyError::TooLong { field, max });
    }
    Ok(trimmed.to_owned())
}

fn optional(
    field: &'static str,
    raw: Option<String>,
    max: Option<usize>,
) -> Result<Option<String>, VocabularyError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if let Some(max) = max {
        if trimmed.chars().count() > max {
            return Err(VocabularyError::TooLong { field, max });
        }
    }
    Ok(Some(trimmed.to_owned()))
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated input for a new vocabulary item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyDraft {
    pub user_id: UserId,
    pub pair: LanguagePair,
    pub text: String,
    pub translation: String,
    pub example: Option<String>,
    pub phonetic: Option<String>,
}

impl VocabularyDraft {
    #[must_use]
    pub fn new(
        user_id: UserId,
        pair: LanguagePair,
        text: impl Into<String>,
        translation: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            pair,
            text: text.into(),
            translation: translation.into(),
            example: None,
            phonetic: None,
        }
    }

    #[must_use]
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    #[must_use]
    pub fn with_phonetic(mut self, phonetic: impl Into<String>) -> Self {
        self.phonetic = Some(phonetic.into());
        self
    }

    /// Trims every field and checks lengths. Blank optional fields become `None`.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyError` if text or translation is blank, or any field is too long.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedItem, VocabularyError> {
        Ok(ValidatedItem {
            user_id: self.user_id,
            pair: self.pair,
            text: required("text", self.text, MAX_TEXT_CHARS)?,
            translation: required("translation", self.translation, MAX_TEXT_CHARS)?,
            example: optional("example", self.example, None)?,
            phonetic: optional("phonetic", self.phonetic, Some(MAX_PHONETIC_CHARS))?,
            created_at: now,
        })
    }
}

/// A validated item that has not been assigned storage identity yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedItem {
    pub user_id: UserId,
    pub pair: LanguagePair,
    pub text: String,
    pub translation: String,
    pub example: Option<String>,
    pub phonetic: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ValidatedItem {
    #[must_use]
    pub fn assign_id(self, id: ItemId) -> VocabularyItem {
        VocabularyItem {
            id,
            user_id: self.user_id,
            pair: self.pair,
            text: self.text,
            translation: self.translation,
            example: self.example,
            phonetic: self.phonetic,
            created_at: self.created_at,
        }
    }
}

//
// ─── ITEM ──────────────────────────────────────────────────────────────────────
//

/// A learnable unit in one user's collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyItem {
    pub id: ItemId,
    pub user_id: UserId,
    pub pair: LanguagePair,
    pub text: String,
    pub translation: String,
    pub example: Option<String>,
    pub phonetic: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Corrective edit of an existing item. `None` leaves a field untouched;
/// `Some("")` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemCorrection {
    pub text: Option<String>,
    pub translation: Option<String>,
    pub example: Option<String>,
    pub phonetic: Option<String>,
}

impl ItemCorrection {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.translation.is_none()
            && self.example.is_none()
            && self.phonetic.is_none()
    }
}

impl VocabularyItem {
    /// Applies a correction, validating the new values before touching `self`.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyError` if a corrected field fails validation.
    pub fn correct(&mut self, correction: ItemCorrection) -> Result<(), VocabularyError> {
        let text = correction
            .text
            .map(|t| required("text", t, MAX_TEXT_CHARS))
            .transpose()?;
        let translation = correction
            .translation
            .map(|t| required("translation", t, MAX_TEXT_CHARS))
            .transpose()?;
        let example = correction
            .example
            .map(|e| optional("example", Some(e), None))
            .transpose()?;
        let phonetic = correction
            .phonetic
            .map(|p| optional("phonetic", Some(p), Some(MAX_PHONETIC_CHARS)))
            .transpose()?;

        if let Some(text) = text {
            self.text = text;
        }
        if let Some(translation) = translation {
            self.translation = translation;
        }
        if let Some(example) = example {
            self.example = example;
        }
        if let Some(phonetic) = phonetic {
            self.phonetic = phonetic;
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
