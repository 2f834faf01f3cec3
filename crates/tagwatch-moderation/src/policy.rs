//! Automatic triage of newly ingested records.

use crate::normalize::normalize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tagwatch_types::{Queue, TweetRecord};

/// Scores normalized text.
///
/// Implementations return a compound polarity in `[-1, 1]`, positive meaning
/// favorable. Scoring runs while the store is locked and must not block.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, normalized_text: &str) -> f64;
}

impl<F> SentimentScorer for F
where
    F: Fn(&str) -> f64 + Send + Sync,
{
    fn score(&self, normalized_text: &str) -> f64 {
        self(normalized_text)
    }
}

/// Which side of the polarity scale is auto-approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Favorable text is approved, unfavorable text is rejected.
    #[default]
    PositiveApproves,
    /// Unfavorable text is approved, favorable text is rejected.
    NegativeApproves,
}

/// Decides which queue a new record lands in.
///
/// With AI triage disabled every record is pending. With it enabled the
/// record's normalized text is scored: a compound at or above
/// `positive_threshold` falls on the positive side, at or below
/// `negative_threshold` on the negative side, and anything between stays
/// pending. [`Polarity`] maps the two sides to approve and reject.
#[derive(Clone)]
pub struct ClassificationPolicy {
    scorer: Arc<dyn SentimentScorer>,
    positive_threshold: f64,
    negative_threshold: f64,
    polarity: Polarity,
}

impl ClassificationPolicy {
    pub const DEFAULT_POSITIVE_THRESHOLD: f64 = 0.05;
    pub const DEFAULT_NEGATIVE_THRESHOLD: f64 = -0.05;

    /// Creates a policy with the default thresholds and polarity.
    pub fn new(scorer: Arc<dyn SentimentScorer>) -> Self {
        Self {
            scorer,
            positive_threshold: Self::DEFAULT_POSITIVE_THRESHOLD,
            negative_threshold: Self::DEFAULT_NEGATIVE_THRESHOLD,
            polarity: Polarity::default(),
        }
    }

    /// Overrides the thresholds. `negative` must not exceed `positive`;
    /// the pair is swapped otherwise.
    pub fn with_thresholds(mut self, positive: f64, negative: f64) -> Self {
        if negative > positive {
            tracing::warn!(positive, negative, "classification thresholds inverted, swapping");
            self.positive_threshold = negative;
            self.negative_threshold = positive;
        } else {
            self.positive_threshold = positive;
            self.negative_threshold = negative;
        }
        self
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn thresholds(&self) -> (f64, f64) {
        (self.positive_threshold, self.negative_threshold)
    }

    /// Picks the queue for `record`.
    pub fn classify(&self, record: &TweetRecord, ai_enabled: bool) -> Queue {
        if !ai_enabled {
            return Queue::Pending;
        }

        let compound = self.scorer.score(&normalize(&record.text)).clamp(-1.0, 1.0);
        let queue = self.queue_for(compound);
        tracing::debug!(id = record.id, compound, queue = queue.as_str(), "auto-classified tweet");
        queue
    }

    /// Maps a compound polarity to a queue.
    pub fn queue_for(&self, compound: f64) -> Queue {
        let (favorable, unfavorable) = match self.polarity {
            Polarity::PositiveApproves => (Queue::Approved, Queue::Rejected),
            Polarity::NegativeApproves => (Queue::Rejected, Queue::Approved),
        };

        if compound >= self.positive_threshold {
            favorable
        } else if compound <= self.negative_threshold {
            unfavorable
        } else {
            Queue::Pending
        }
    }
}

impl fmt::Debug for ClassificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassificationPolicy")
            .field("positive_threshold", &self.positive_threshold)
            .field("negative_threshold", &self.negative_threshold)
            .field("polarity", &self.polarity)
            .finish_non_exhaustive()
    }
}
