use serde::{Deserialize, Serialize};
use std::fmt;

fn default_api_base() -> String {
    "https://api.twitter.com".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_idle_timeout_secs() -> u64 {
    30
}

fn default_rule_tag() -> String {
    "tagwatch".to_string()
}

/// Credentials and endpoints for the filtered stream.
#[derive(Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    /// App-only bearer token. Empty means the client is unconfigured.
    #[serde(default, skip_serializing)]
    pub bearer_token: String,
    /// Base URL of the API, without a trailing slash.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// TCP connect timeout.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Longest silence tolerated on an open stream. The upstream sends a
    /// keep-alive newline about every 20 seconds, so anything quieter is a
    /// dead connection.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Label attached to the rule this client installs.
    #[serde(default = "default_rule_tag")]
    pub rule_tag: String,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            bearer_token: String::new(),
            api_base: default_api_base(),
            connect_timeout_secs: default_connect_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            rule_tag: default_rule_tag(),
        }
    }
}

impl fmt::Debug for TwitterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitterConfig")
            .field("bearer_token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("rule_tag", &self.rule_tag)
            .finish()
    }
}

impl TwitterConfig {
    pub fn new(bearer_token: impl Into<String>) -> Self {
        Self {
            bearer_token: bearer_token.into(),
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.bearer_token.trim().is_empty()
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }
}
