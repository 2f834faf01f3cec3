//! Decoding of filtered-stream lines.

use serde::Deserialize;
use tagwatch_moderation::UpstreamError;
use tagwatch_types::{Author, RawStreamItem};

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<TweetData>,
    #[serde(default)]
    includes: Includes,
    #[serde(default)]
    errors: Vec<Problem>,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    text: String,
    author_id: Option<String>,
    note_tweet: Option<NoteTweet>,
}

#[derive(Debug, Deserialize)]
struct NoteTweet {
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    profile_image_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Problem {
    #[serde(default)]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) detail: String,
}

impl Problem {
    pub(crate) fn describe(problems: &[Problem]) -> String {
        problems
            .iter()
            .map(|p| match (p.title.is_empty(), p.detail.is_empty()) {
                (false, false) => format!("{}: {}", p.title, p.detail),
                (false, true) => p.title.clone(),
                _ => p.detail.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Decodes one line of the stream.
///
/// Blank keep-alive lines yield `Ok(None)`. A line carrying only `errors`
/// means the upstream is closing the connection and yields
/// [`UpstreamError::Disconnected`]. Anything unparseable is
/// [`UpstreamError::Decode`].
pub fn decode_line(line: &str) -> Result<Option<RawStreamItem>, UpstreamError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let envelope: Envelope =
        serde_json::from_str(line).map_err(|e| UpstreamError::Decode(e.to_string()))?;

    let Some(data) = envelope.data else {
        if envelope.errors.is_empty() {
            return Ok(None);
        }
        return Err(UpstreamError::Disconnected(Problem::describe(&envelope.errors)));
    };

    let author = data
        .author_id
        .as_deref()
        .and_then(|id| envelope.includes.users.iter().find(|u| u.id == id))
        .map(|user| Author {
            external_id: user.id.clone(),
            display_name: user.name.clone(),
            handle: user.username.clone(),
            // v2 only serves the HTTPS avatar.
            avatar_url: user.profile_image_url.clone(),
            avatar_url_https: user.profile_image_url.clone(),
        })
        .unwrap_or_else(|| Author {
            external_id: data.author_id.clone().unwrap_or_default(),
            ..Author::default()
        });

    Ok(Some(RawStreamItem {
        text: data.text,
        extended_text: data.note_tweet.map(|note| note.text),
        author,
    }))
}

/// Splits a byte stream into lines. Partial lines are held until completed.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    pub(crate) fn next_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}
