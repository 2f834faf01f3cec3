//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use tagwatch_moderation::{
    ClassificationPolicy, LexiconError, Polarity, TagMatch, UpstreamError,
};
use tagwatch_twitter::TwitterConfig;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Upstream stream credentials and endpoints.
    #[serde(default)]
    pub twitter: TwitterConfig,

    /// Triage policy and change broadcast settings.
    #[serde(default)]
    pub moderation: ModerationConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "tagwatch_moderation=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Automatic triage settings.
///
/// Positive compound scores at or above `positive_threshold` and negative
/// ones at or below `negative_threshold` are decided automatically when AI
/// triage is on; `polarity` says which side is approved.
#[derive(Debug, Clone, Deserialize)]
pub struct ModerationConfig {
    #[serde(default = "default_positive_threshold")]
    pub positive_threshold: f64,

    #[serde(default = "default_negative_threshold")]
    pub negative_threshold: f64,

    #[serde(default)]
    pub polarity: Polarity,

    /// Whether stream text must carry the `#` marker to match the tag.
    #[serde(default)]
    pub tag_match: TagMatch,

    /// VADER-format lexicon file scored by `LexiconScorer` instead of the
    /// default `VaderScorer`.
    #[serde(default)]
    pub lexicon_path: Option<String>,

    /// Snapshots buffered per observer before it starts lagging.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_positive_threshold() -> f64 {
    ClassificationPolicy::DEFAULT_POSITIVE_THRESHOLD
}

fn default_negative_threshold() -> f64 {
    ClassificationPolicy::DEFAULT_NEGATIVE_THRESHOLD
}

fn default_broadcast_capacity() -> usize {
    256
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            positive_threshold: default_positive_threshold(),
            negative_threshold: default_negative_threshold(),
            polarity: Polarity::default(),
            tag_match: TagMatch::default(),
            lexicon_path: None,
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configured sentiment lexicon could not be loaded.
    #[error("failed to load sentiment lexicon: {0}")]
    Lexicon(#[from] LexiconError),

    /// The upstream client could not be built.
    #[error("failed to build upstream client: {0}")]
    Upstream(#[from] UpstreamError),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `TAGWATCH_HOST` overrides `server.host`
/// - `TAGWATCH_PORT` overrides `server.port`
/// - `TAGWATCH_LOG_LEVEL` overrides `logging.level`
/// - `TAGWATCH_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `TWITTER_BEARER_TOKEN` overrides `twitter.bearer_token`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    if let Ok(host) = std::env::var("TAGWATCH_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("TAGWATCH_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(level) = std::env::var("TAGWATCH_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("TAGWATCH_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(token) = std::env::var("TWITTER_BEARER_TOKEN") {
        if !token.trim().is_empty() {
            config.twitter.bearer_token = token;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.moderation.positive_threshold, 0.05);
        assert_eq!(config.moderation.negative_threshold, -0.05);
        assert_eq!(config.moderation.polarity, Polarity::PositiveApproves);
        assert_eq!(config.moderation.tag_match, TagMatch::Keyword);
        assert_eq!(config.moderation.broadcast_capacity, 256);
        assert!(config.moderation.lexicon_path.is_none());
    }

    #[test]
    fn parses_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
port = 8081

[twitter]
bearer_token = "from-file"

[moderation]
polarity = "negative_approves"
tag_match = "marked"
positive_threshold = 0.3
"#
        )
        .unwrap();

        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.server.port, 8081);
        assert!(config.twitter.is_configured());
        assert_eq!(config.moderation.polarity, Polarity::NegativeApproves);
        assert_eq!(config.moderation.tag_match, TagMatch::Marked);
        assert_eq!(config.moderation.positive_threshold, 0.3);
        assert_eq!(config.moderation.negative_threshold, -0.05);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = load_config(Some("/nonexistent/tagwatch.toml")).unwrap();
        assert_eq!(config.server.port, Config::default().server.port);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[server\nport = ").unwrap();
        assert!(matches!(
            load_config(file.path().to_str()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn upstream_build_failures_are_config_errors() {
        let err: ConfigError = UpstreamError::Config("no tls backend".to_string()).into();
        assert!(matches!(err, ConfigError::Upstream(UpstreamError::Config(_))));
        assert!(err.to_string().contains("failed to build upstream client"));
    }
}
