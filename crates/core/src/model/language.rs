use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LanguageError {
    #[error("unsupported language code: {0}")]
    UnknownLanguage(String),

    #[error("malformed language pair: {0}")]
    MalformedPair(String),

    #[error("language pair must use two different languages, got {0} twice")]
    SameLanguage(Language),
}

/// Languages the vocabulary collection supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ko,
    Ru,
}

impl Language {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ko => "ko",
            Language::Ru => "ru",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = LanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "ko" => Ok(Language::Ko),
            "ru" => Ok(Language::Ru),
            other => Err(LanguageError::UnknownLanguage(other.to_owned())),
        }
    }
}

/// Direction of study: words in `source` are learned with `target` translations.
///
/// Parses from `en-ru` or `en_ru`; displays as `en-ru`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    source: Language,
    target: Language,
}

impl LanguagePair {
    /// # Errors
    ///
    /// Returns `LanguageError::SameLanguage` if both sides are equal.
    pub fn new(source: Language, target: Language) -> Result<Self, LanguageError> {
        if source == target {
            return Err(LanguageError::SameLanguage(source));
        }
        Ok(Self { source, target })
    }

    #[must_use]
    pub fn source(&self) -> Language {
        self.source
    }

    #[must_use]
    pub fn target(&self) -> Language {
        self.target
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}

impl FromStr for LanguagePair {
    type Err = LanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, target) = s
            .trim()
            .split_once(['-', '_'])
            .ok_or_else(|| LanguageError::MalformedPair(s.to_owned()))?;
        Self::new(source.parse()?, target.parse()?)
    }
}
