//! Watch lifecycle: opening, stopping and clearing the upstream subscription.

use crate::error::{ModerationError, UpstreamError};
use crate::store::{canonical_tag, ModerationStore};
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::Arc;
use tagwatch_types::{Language, ModerationSnapshot, RawStreamItem};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Items delivered by an open subscription. An `Err` ends the session.
pub type ItemStream = BoxStream<'static, Result<RawStreamItem, UpstreamError>>;

/// What the upstream is asked to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFilter {
    /// Canonical tag, including the `#`.
    pub track: String,
    pub language: Option<Language>,
}

/// A source of raw stream items, such as a filtered-stream API client.
///
/// Dropping the returned stream must close the subscription.
pub trait UpstreamSource: Send + Sync {
    fn open(&self, filter: StreamFilter) -> BoxFuture<'_, Result<ItemStream, UpstreamError>>;
}

#[derive(Debug, Default)]
struct Subscription {
    task: Option<JoinHandle<()>>,
    /// Set by the first successful watch; `clear` is a no-op until then.
    opened: bool,
}

/// Drives ingestion from an [`UpstreamSource`] into a [`ModerationStore`].
///
/// Lifecycle commands are serialized by an async lock so a slow `watch`
/// (which awaits the upstream) cannot interleave with `stop` or `clear`.
pub struct StreamWatcher {
    store: Arc<ModerationStore>,
    upstream: Arc<dyn UpstreamSource>,
    subscription: Mutex<Subscription>,
}

impl StreamWatcher {
    pub fn new(store: Arc<ModerationStore>, upstream: Arc<dyn UpstreamSource>) -> Self {
        Self {
            store,
            upstream,
            subscription: Mutex::new(Subscription::default()),
        }
    }

    pub fn store(&self) -> &Arc<ModerationStore> {
        &self.store
    }

    /// Starts watching `tag`, optionally restricted to `language`.
    ///
    /// Already watching: returns the current snapshot without reopening or
    /// broadcasting. An unsupported language code is logged and ignored; the
    /// watch proceeds unfiltered.
    ///
    /// # Errors
    ///
    /// [`ModerationError::InvalidTag`] for an empty tag, and
    /// [`ModerationError::Upstream`] if the subscription cannot be opened.
    /// State is unchanged in both cases.
    pub async fn watch(
        &self,
        tag: &str,
        language: Option<&str>,
    ) -> Result<ModerationSnapshot, ModerationError> {
        let mut sub = self.subscription.lock().await;

        if self.store.is_watching() {
            tracing::debug!("watch requested while already watching");
            return Ok(self.store.snapshot());
        }

        let tag = canonical_tag(tag)?;
        let language = match language.map(str::trim).filter(|code| !code.is_empty()) {
            None => None,
            Some(code) => match Language::from_code(code) {
                Ok(lang) => Some(lang),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring language filter");
                    None
                }
            },
        };

        let filter = StreamFilter {
            track: tag.clone(),
            language,
        };
        let items = self.upstream.open(filter).await?;

        if let Some(stale) = sub.task.take() {
            stale.abort();
        }
        let session = self.store.begin_session(tag.clone(), language);
        sub.task = Some(tokio::spawn(pump(self.store.clone(), session, items)));
        sub.opened = true;

        tracing::info!(tag = %tag, language = ?language, session, "watching");
        Ok(self.store.snapshot())
    }

    /// Closes the subscription and stops ingestion. Queues are kept.
    ///
    /// Returns `false` (and broadcasts nothing) if not watching. Once this
    /// returns, no further item reaches the store.
    pub async fn stop(&self) -> bool {
        let mut sub = self.subscription.lock().await;

        if !self.store.is_watching() {
            return false;
        }
        if let Some(task) = sub.task.take() {
            task.abort();
        }
        let stopped = self.store.end_session(None);
        tracing::info!("stopped watching");
        stopped
    }

    /// Closes any subscription and discards all queued records, resets ids
    /// and turns automatic triage off. Tag and language survive.
    ///
    /// Returns `false` (and broadcasts nothing) if no subscription was ever
    /// opened.
    pub async fn clear(&self) -> bool {
        let mut sub = self.subscription.lock().await;

        if !sub.opened {
            return false;
        }
        if let Some(task) = sub.task.take() {
            task.abort();
        }
        self.store.reset();
        tracing::info!("cleared moderation queues");
        true
    }
}

impl Drop for StreamWatcher {
    fn drop(&mut self) {
        if let Some(task) = self.subscription.get_mut().task.take() {
            task.abort();
        }
    }
}

/// Feeds items into the store until the subscription ends.
///
/// Any end other than an abort from `stop`/`clear` is a disconnect and stops
/// the session.
async fn pump(store: Arc<ModerationStore>, session: u64, mut items: ItemStream) {
    let reason = loop {
        match items.next().await {
            Some(Ok(item)) => {
                store.ingest(session, &item);
            }
            Some(Err(e)) => break e.to_string(),
            None => break "stream closed".to_string(),
        }
    };

    if store.end_session(Some(session)) {
        tracing::warn!(session, reason = %reason, "upstream subscription ended, watch stopped");
    }
}
