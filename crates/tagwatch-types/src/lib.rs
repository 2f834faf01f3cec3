//! Shared types for the tagwatch moderation service.
//!
//! This crate holds the data model every other crate speaks: the closed set
//! of stream languages, the immutable [`TweetRecord`] produced by ingestion,
//! the [`RawStreamItem`] handed over by the upstream client, and the
//! [`ModerationSnapshot`] broadcast to observers after every mutation.
//!
//! Nothing here performs I/O. Field names on the serialized forms follow the
//! wire format the moderation dashboard consumes (`hashtag`, `list`,
//! `ai_enabled`, `screen_name`, ...).

use serde::{Deserialize, Serialize};

mod record;
mod snapshot;

pub use record::{Author, RawStreamItem, TweetRecord};
pub use snapshot::ModerationSnapshot;

/// Languages the upstream stream can be filtered by.
///
/// Each language is addressed by its two-letter code. The set is closed:
/// any other code is rejected by [`Language::from_code`].
///
/// On the wire a language is its code; [`Language::code`] is the only place
/// the codes are spelled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Language {
    Arabic,
    Dutch,
    English,
    Farsi,
    French,
    German,
    Indonesian,
    Italian,
    Japanese,
    Portuguese,
    Spanish,
}

impl Language {
    /// Every supported language, in code order of the upstream docs.
    pub const ALL: [Language; 11] = [
        Self::Arabic,
        Self::Dutch,
        Self::English,
        Self::Farsi,
        Self::French,
        Self::German,
        Self::Indonesian,
        Self::Italian,
        Self::Japanese,
        Self::Portuguese,
        Self::Spanish,
    ];

    /// Returns the two-letter code for this language.
    pub fn code(self) -> &'static str {
        match self {
            Self::Arabic => "ar",
            Self::Dutch => "nl",
            Self::English => "en",
            Self::Farsi => "fa",
            Self::French => "fr",
            Self::German => "de",
            Self::Indonesian => "id",
            Self::Italian => "it",
            Self::Japanese => "ja",
            Self::Portuguese => "pt",
            Self::Spanish => "es",
        }
    }

    /// Returns the English display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Arabic => "Arabic",
            Self::Dutch => "Dutch",
            Self::English => "English",
            Self::Farsi => "Farsi",
            Self::French => "French",
            Self::German => "German",
            Self::Indonesian => "Indonesian",
            Self::Italian => "Italian",
            Self::Japanese => "Japanese",
            Self::Portuguese => "Portuguese",
            Self::Spanish => "Spanish",
        }
    }

    /// Looks up a language by its two-letter code.
    ///
    /// Codes are matched exactly; `"EN"` is not `"en"`.
    pub fn from_code(code: &str) -> Result<Self, ParseLanguageError> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == code)
            .ok_or_else(|| ParseLanguageError(code.to_string()))
    }
}

impl std::str::FromStr for Language {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.code().to_string()
    }
}

impl TryFrom<String> for Language {
    type Error = ParseLanguageError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::from_code(&code)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when a language code is not in the supported set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language code: {0:?}")]
pub struct ParseLanguageError(pub String);

/// The three moderation queues a record can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Queue {
    /// Awaiting a human decision.
    Pending,
    /// Accepted for display.
    Approved,
    /// Refused.
    Rejected,
}

impl Queue {
    /// Returns the lowercase label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}
