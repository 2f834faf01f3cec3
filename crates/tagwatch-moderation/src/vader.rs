//! The default scorer: the full VADER analyzer.

use crate::policy::SentimentScorer;
use std::fmt;
use vader_sentiment::SentimentIntensityAnalyzer;

/// A [`SentimentScorer`] returning VADER's compound score.
///
/// Uses the complete VADER lexicon and rule set (negation, boosters, "but"
/// shifts, punctuation and emoji), so ordinary posts get a non-zero score.
pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VaderScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaderScorer").finish_non_exhaustive()
    }
}

impl SentimentScorer for VaderScorer {
    fn score(&self, normalized_text: &str) -> f64 {
        self.analyzer
            .polarity_scores(normalized_text)
            .get("compound")
            .copied()
            .unwrap_or(0.0)
    }
}
