//! Lexicon-based sentiment scorer for deployments that bring their own
//! VADER-format valence table.
//!
//! Follows the VADER scoring scheme in reduced form: each known token
//! contributes its valence, intensity boosters and a preceding negator adjust
//! it, trailing exclamation marks add emphasis, and the sum is squashed into
//! `[-1, 1]` with `s / sqrt(s^2 + 15)`.

use crate::error::LexiconError;
use crate::policy::SentimentScorer;
use std::collections::HashMap;
use std::path::Path;

/// Normalization constant for the compound score.
const ALPHA: f64 = 15.0;

/// Added to (or subtracted from) a valence by an intensity modifier.
const BOOSTER_INCREMENT: f64 = 0.293;

/// Multiplier applied when a negator precedes a valence token.
const NEGATION_SCALAR: f64 = -0.74;

/// How many preceding tokens are checked for a negator.
const NEGATION_WINDOW: usize = 3;

/// Emphasis added per exclamation mark, capped at four marks.
const EXCLAMATION_INCREMENT: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;

const NEGATORS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "nowhere", "cannot",
    "without", "aint", "dont", "isnt", "wasnt", "wont", "cant", "doesnt", "didnt",
];

const BOOSTERS: &[(&str, f64)] = &[
    ("absolutely", BOOSTER_INCREMENT),
    ("completely", BOOSTER_INCREMENT),
    ("extremely", BOOSTER_INCREMENT),
    ("incredibly", BOOSTER_INCREMENT),
    ("really", BOOSTER_INCREMENT),
    ("so", BOOSTER_INCREMENT),
    ("totally", BOOSTER_INCREMENT),
    ("very", BOOSTER_INCREMENT),
    ("barely", -BOOSTER_INCREMENT),
    ("hardly", -BOOSTER_INCREMENT),
    ("kinda", -BOOSTER_INCREMENT),
    ("slightly", -BOOSTER_INCREMENT),
    ("somewhat", -BOOSTER_INCREMENT),
];

/// Mean valences on the VADER -4..=4 scale.
const BUILTIN_LEXICON: &[(&str, f64)] = &[
    ("amazing", 2.8),
    ("awesome", 3.1),
    ("beautiful", 2.9),
    ("best", 3.2),
    ("brilliant", 2.8),
    ("celebrate", 2.7),
    ("cool", 1.3),
    ("excellent", 2.7),
    ("excited", 1.4),
    ("fantastic", 2.6),
    ("fun", 2.3),
    ("glad", 2.0),
    ("good", 1.9),
    ("great", 3.1),
    ("happy", 2.7),
    ("hope", 1.9),
    ("impressive", 2.3),
    ("like", 1.5),
    ("love", 3.2),
    ("lovely", 2.8),
    ("nice", 1.8),
    ("perfect", 2.7),
    ("pretty", 2.2),
    ("proud", 2.1),
    ("safe", 1.9),
    ("success", 2.7),
    ("support", 1.7),
    ("thanks", 1.9),
    ("win", 2.8),
    ("wonderful", 2.7),
    ("wow", 2.8),
    ("yes", 1.7),
    ("abuse", -3.2),
    ("angry", -2.3),
    ("annoying", -1.7),
    ("awful", -2.0),
    ("bad", -2.5),
    ("boring", -1.3),
    ("broken", -2.0),
    ("crap", -1.6),
    ("cry", -2.1),
    ("dead", -3.3),
    ("disappointed", -1.9),
    ("disgusting", -2.4),
    ("fail", -2.5),
    ("fake", -2.1),
    ("fear", -2.2),
    ("hate", -2.7),
    ("horrible", -2.5),
    ("hurt", -2.4),
    ("kill", -3.7),
    ("lie", -1.6),
    ("lose", -1.6),
    ("mad", -2.2),
    ("pathetic", -2.6),
    ("poor", -2.1),
    ("sad", -2.1),
    ("scam", -2.4),
    ("shame", -2.1),
    ("sick", -2.3),
    ("stupid", -2.4),
    ("terrible", -2.1),
    ("trash", -1.8),
    ("ugly", -2.3),
    ("upset", -1.6),
    ("useless", -1.8),
    ("worst", -3.1),
    ("wrong", -2.1),
];

/// A [`SentimentScorer`] backed by a word-valence table.
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    valences: HashMap<String, f64>,
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LexiconScorer {
    /// The scorer with the built-in lexicon.
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN_LEXICON.iter().map(|(w, v)| (w.to_string(), *v)))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, f64)>) -> Self {
        Self {
            valences: entries.into_iter().collect(),
        }
    }

    /// Parses a VADER-format lexicon: one `token<TAB>mean[<TAB>...]` entry per
    /// line. Blank lines and lines starting with `#` are skipped.
    pub fn parse(contents: &str) -> Result<Self, LexiconError> {
        let mut valences = HashMap::new();

        for (idx, line) in contents.lines().enumerate() {
            let line_no = idx + 1;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split('\t');
            let token = fields.next().unwrap_or_default().trim();
            let mean = fields.next().ok_or_else(|| LexiconError::Malformed {
                line: line_no,
                reason: "missing valence column".to_string(),
            })?;
            if token.is_empty() {
                return Err(LexiconError::Malformed {
                    line: line_no,
                    reason: "empty token".to_string(),
                });
            }
            let mean: f64 = mean.trim().parse().map_err(|e| LexiconError::Malformed {
                line: line_no,
                reason: format!("invalid valence {mean:?}: {e}"),
            })?;

            valences.insert(token.to_lowercase(), mean);
        }

        Ok(Self { valences })
    }

    /// Loads a lexicon file. See [`LexiconScorer::parse`] for the format.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LexiconError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn len(&self) -> usize {
        self.valences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valences.is_empty()
    }

    fn valence(&self, word: &str) -> Option<f64> {
        self.valences.get(word).copied()
    }
}

fn booster(word: &str) -> Option<f64> {
    BOOSTERS
        .iter()
        .find(|(w, _)| *w == word)
        .map(|(_, inc)| *inc)
}

fn is_negator(word: &str) -> bool {
    NEGATORS.contains(&word) || word.ends_with("n't")
}

fn strip_punctuation(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
}

impl SentimentScorer for LexiconScorer {
    fn score(&self, normalized_text: &str) -> f64 {
        let words: Vec<String> = normalized_text
            .split_whitespace()
            .map(|t| strip_punctuation(t).to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        let mut sum = 0.0;
        for (i, word) in words.iter().enumerate() {
            // Boosters modify the next token rather than carry a valence.
            if booster(word).is_some() {
                continue;
            }
            let Some(mut valence) = self.valence(word) else {
                continue;
            };

            if let Some(prev) = i.checked_sub(1).and_then(|p| words.get(p)) {
                if let Some(inc) = booster(prev) {
                    valence += inc.copysign(valence);
                }
            }

            let window = &words[i.saturating_sub(NEGATION_WINDOW)..i];
            if window.iter().any(|w| is_negator(w)) {
                valence *= NEGATION_SCALAR;
            }

            sum += valence;
        }

        if sum != 0.0 {
            let marks = normalized_text.matches('!').count().min(MAX_EXCLAMATIONS);
            sum += (marks as f64 * EXCLAMATION_INCREMENT).copysign(sum);
        }

        (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0)
    }
}
