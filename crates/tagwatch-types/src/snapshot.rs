//! The state broadcast to observers.

use crate::{Language, TweetRecord};
use serde::{Deserialize, Serialize};

/// A full copy of the moderation state at one point in time.
///
/// A snapshot is emitted after every mutation, so observers never need to
/// apply deltas.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModerationSnapshot {
    /// Canonical tag, including the leading `#`. Empty before the first watch.
    #[serde(rename = "hashtag")]
    pub tag: String,
    /// Language filter applied to the current (or last) subscription.
    pub language: Option<Language>,
    /// Whether a stream subscription is active.
    pub watching: bool,
    /// Whether new items are triaged automatically.
    pub ai_enabled: bool,
    /// Pending records, oldest first.
    #[serde(rename = "list")]
    pub pending: Vec<TweetRecord>,
    /// Approved records, most recent first.
    pub approved: Vec<TweetRecord>,
    /// Rejected records, most recent first.
    pub rejected: Vec<TweetRecord>,
}

impl ModerationSnapshot {
    /// Total number of records across the three queues.
    pub fn len(&self) -> usize {
        self.pending.len() + self.approved.len() + self.rejected.len()
    }

    /// Returns `true` if all three queues are empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_wire_shape() {
        let value = serde_json::to_value(ModerationSnapshot::default()).unwrap();
        assert_eq!(value["hashtag"], "");
        assert_eq!(value["watching"], false);
        assert_eq!(value["ai_enabled"], false);
        assert!(value["language"].is_null());
        assert_eq!(value["list"], serde_json::json!([]));
        assert_eq!(value["approved"], serde_json::json!([]));
        assert_eq!(value["rejected"], serde_json::json!([]));
    }

    #[test]
    fn language_is_serialized_by_code() {
        let snapshot = ModerationSnapshot {
            tag: "#demo".to_string(),
            language: Some(Language::German),
            ..Default::default()
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["language"], "de");
        assert_eq!(value["hashtag"], "#demo");
        assert!(snapshot.is_empty());
    }
}
