//! HTTP client for the v2 filtered stream.

use crate::config::TwitterConfig;
use crate::decode::{decode_line, LineBuffer, Problem};
use futures_util::future::BoxFuture;
use futures_util::stream::{self, Stream, StreamExt};
use futures_util::FutureExt;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tagwatch_moderation::{ItemStream, StreamFilter, UpstreamError, UpstreamSource};

const RULES_PATH: &str = "/2/tweets/search/stream/rules";
const STREAM_PATH: &str = "/2/tweets/search/stream";

/// Fields requested on every streamed post.
const STREAM_QUERY: &[(&str, &str)] = &[
    ("tweet.fields", "note_tweet,lang"),
    ("expansions", "author_id"),
    ("user.fields", "name,username,profile_image_url"),
];

/// Builds the stream rule for a filter, e.g. `#rustlang lang:en`.
pub fn rule_for(filter: &StreamFilter) -> String {
    match filter.language {
        Some(lang) => format!("{} lang:{}", filter.track, lang.code()),
        None => filter.track.clone(),
    }
}

#[derive(Debug, Deserialize)]
struct RuleList {
    #[serde(default)]
    data: Vec<Rule>,
}

#[derive(Debug, Deserialize)]
struct Rule {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RuleUpdate {
    #[serde(default)]
    errors: Vec<Problem>,
}

/// Subscribes to the filtered stream with a bearer token.
#[derive(Debug, Clone)]
pub struct FilteredStreamClient {
    http: reqwest::Client,
    config: TwitterConfig,
}

impl FilteredStreamClient {
    /// # Errors
    ///
    /// [`UpstreamError::Config`] if the HTTP client cannot be built.
    pub fn new(config: TwitterConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(concat!("tagwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::Config(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &TwitterConfig {
        &self.config
    }

    fn token(&self) -> Result<&str, UpstreamError> {
        if !self.config.is_configured() {
            return Err(UpstreamError::Config("twitter bearer token is not set".to_string()));
        }
        Ok(self.config.bearer_token.trim())
    }

    /// Deletes every installed rule and installs `rule` in their place.
    pub async fn replace_rules(&self, rule: &str) -> Result<(), UpstreamError> {
        let token = self.token()?;
        let url = self.config.endpoint(RULES_PATH);

        let existing: RuleList = check(
            self.http
                .get(&url)
                .bearer_auth(token)
                .send()
                .await
                .map_err(connect_error)?,
        )
        .await?
        .json()
        .await
        .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        if !existing.data.is_empty() {
            let ids: Vec<&str> = existing.data.iter().map(|r| r.id.as_str()).collect();
            tracing::debug!(count = ids.len(), "deleting existing stream rules");
            check(
                self.http
                    .post(&url)
                    .bearer_auth(token)
                    .json(&json!({ "delete": { "ids": ids } }))
                    .send()
                    .await
                    .map_err(connect_error)?,
            )
            .await?;
        }

        let response = check(
            self.http
                .post(&url)
                .bearer_auth(token)
                .json(&json!({ "add": [{ "value": rule, "tag": self.config.rule_tag }] }))
                .send()
                .await
                .map_err(connect_error)?,
        )
        .await?;
        let status = response.status().as_u16();
        let update: RuleUpdate = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;
        if !update.errors.is_empty() {
            return Err(UpstreamError::Status {
                status,
                body: Problem::describe(&update.errors),
            });
        }

        tracing::info!(rule, "installed stream rule");
        Ok(())
    }

    /// Connects to the stream and returns its items.
    pub async fn connect(&self) -> Result<ItemStream, UpstreamError> {
        let token = self.token()?;
        let response = check(
            self.http
                .get(self.config.endpoint(STREAM_PATH))
                .query(STREAM_QUERY)
                .bearer_auth(token)
                .send()
                .await
                .map_err(connect_error)?,
        )
        .await?;

        tracing::info!("connected to filtered stream");
        let idle = Duration::from_secs(self.config.idle_timeout_secs);
        Ok(items(response.bytes_stream(), idle))
    }
}

impl UpstreamSource for FilteredStreamClient {
    fn open(&self, filter: StreamFilter) -> BoxFuture<'_, Result<ItemStream, UpstreamError>> {
        async move {
            self.replace_rules(&rule_for(&filter)).await?;
            self.connect().await
        }
        .boxed()
    }
}

fn connect_error(e: reqwest::Error) -> UpstreamError {
    UpstreamError::Connect(e.to_string())
}

/// Passes success responses through and turns the rest into
/// [`UpstreamError::Status`].
async fn check(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Turns the response body into decoded items.
///
/// Undecodable lines are logged and skipped. A transport error, an error
/// payload, the end of the body, or no bytes at all for `idle` ends the
/// stream with one final `Err`.
fn items<S, B>(body: S, idle: Duration) -> ItemStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    struct Cursor<S> {
        body: std::pin::Pin<Box<S>>,
        lines: LineBuffer,
        finished: bool,
    }

    let cursor = Cursor {
        body: Box::pin(body),
        lines: LineBuffer::default(),
        finished: false,
    };

    stream::unfold(cursor, move |mut cursor| async move {
        if cursor.finished {
            return None;
        }
        loop {
            while let Some(line) = cursor.lines.next_line() {
                match decode_line(&line) {
                    Ok(Some(item)) => return Some((Ok(item), cursor)),
                    Ok(None) => {}
                    Err(UpstreamError::Decode(e)) => {
                        tracing::warn!(error = %e, "skipping undecodable stream line");
                    }
                    Err(e) => {
                        cursor.finished = true;
                        return Some((Err(e), cursor));
                    }
                }
            }

            let end = match tokio::time::timeout(idle, cursor.body.next()).await {
                Ok(Some(Ok(chunk))) => {
                    cursor.lines.push(chunk.as_ref());
                    continue;
                }
                Ok(Some(Err(e))) => UpstreamError::Disconnected(e.to_string()),
                Ok(None) => UpstreamError::Disconnected("stream closed by upstream".to_string()),
                Err(_) => UpstreamError::Disconnected(format!(
                    "no data or keep-alive within {}s",
                    idle.as_secs()
                )),
            };
            cursor.finished = true;
            return Some((Err(end), cursor));
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagwatch_types::Language;

    #[test]
    fn rule_includes_language_when_set() {
        let mut filter = StreamFilter {
            track: "#demo".to_string(),
            language: None,
        };
        assert_eq!(rule_for(&filter), "#demo");
        filter.language = Some(Language::Dutch);
        assert_eq!(rule_for(&filter), "#demo lang:nl");
    }

    #[tokio::test]
    async fn unconfigured_client_refuses_to_open() {
        let client = FilteredStreamClient::new(TwitterConfig::default()).unwrap();
        let err = client
            .open(StreamFilter {
                track: "#demo".to_string(),
                language: None,
            })
            .await
            .err()
            .expect("open should fail without a token");
        assert!(matches!(err, UpstreamError::Config(_)));
    }
}
