//! Error types for the moderation pipeline.

/// Errors returned by moderation commands.
#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    /// No queue holds a record with this id.
    #[error("tweet {0} not found in any queue")]
    NotFound(u64),

    /// The tag is empty once whitespace and the marker are removed.
    #[error("invalid tag: {0:?}")]
    InvalidTag(String),

    /// The upstream subscription could not be opened.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Errors raised by an upstream stream subscription.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The connection could not be established.
    #[error("upstream connect failed: {0}")]
    Connect(String),

    /// The upstream answered with a non-success status.
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// A response body could not be decoded.
    #[error("upstream decode error: {0}")]
    Decode(String),

    /// The subscription ended without being stopped.
    #[error("upstream disconnected: {0}")]
    Disconnected(String),

    /// The client is missing credentials or endpoints.
    #[error("upstream not configured: {0}")]
    Config(String),
}

/// Errors that can occur when loading a sentiment lexicon.
#[derive(Debug, thiserror::Error)]
pub enum LexiconError {
    /// The lexicon file could not be read.
    #[error("failed to read lexicon: {0}")]
    Io(#[from] std::io::Error),

    /// A line did not have a token and a numeric valence.
    #[error("malformed lexicon entry on line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}
