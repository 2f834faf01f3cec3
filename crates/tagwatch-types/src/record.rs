//! Stream items and the records built from them.

use serde::{Deserialize, Serialize};

/// The author fields retained from an upstream user object.
///
/// Only these five fields survive ingestion; everything else the upstream
/// sends about a user is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Author {
    /// Upstream user id.
    #[serde(rename = "id")]
    pub external_id: String,
    /// Display name.
    #[serde(rename = "name")]
    pub display_name: String,
    /// Handle without the leading `@`.
    #[serde(rename = "screen_name")]
    pub handle: String,
    /// Avatar URL as delivered by the upstream.
    #[serde(rename = "profile_image_url")]
    pub avatar_url: String,
    /// Avatar URL guaranteed to be served over HTTPS.
    #[serde(rename = "profile_image_url_https")]
    pub avatar_url_https: String,
}

/// A moderated item. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetRecord {
    /// Session-local id, strictly increasing from 1.
    pub id: u64,
    /// Display text (the expanded form when the upstream provided one).
    pub text: String,
    /// Author projection.
    #[serde(rename = "user")]
    pub author: Author,
}

/// One item as delivered by the upstream subscription, before filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawStreamItem {
    /// The raw (possibly truncated) text. Retweet detection reads this.
    pub text: String,
    /// Extended full text, present for long posts.
    pub extended_text: Option<String>,
    /// Author projection.
    pub author: Author,
}

impl RawStreamItem {
    /// Returns the text to display: the extended text when it is present and
    /// non-empty, the raw text otherwise.
    pub fn display_text(&self) -> &str {
        match self.extended_text.as_deref() {
            Some(full) if !full.is_empty() => full,
            _ => &self.text,
        }
    }
}
