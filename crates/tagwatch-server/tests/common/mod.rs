//! Shared fixtures for the server integration tests.

#![allow(dead_code)]

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tagwatch_moderation::{
    ClassificationPolicy, ItemStream, StreamFilter, TagMatch, UpstreamError, UpstreamSource,
};
use tagwatch_server::AppState;
use tagwatch_types::{Author, ModerationSnapshot, RawStreamItem};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

pub type Feed = mpsc::UnboundedSender<Result<RawStreamItem, UpstreamError>>;

/// Upstream that hands out one in-memory channel per subscription.
#[derive(Default)]
pub struct MemoryUpstream {
    filters: Mutex<Vec<StreamFilter>>,
    feeds: Mutex<Vec<Feed>>,
    pub refuse: AtomicBool,
}

impl MemoryUpstream {
    pub fn feed(&self) -> Feed {
        self.feeds
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no subscription opened")
    }

    pub fn opened(&self) -> Vec<StreamFilter> {
        self.filters.lock().unwrap().clone()
    }
}

impl UpstreamSource for MemoryUpstream {
    fn open(&self, filter: StreamFilter) -> BoxFuture<'_, Result<ItemStream, UpstreamError>> {
        async move {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(UpstreamError::Connect("connection refused".to_string()));
            }
            let (tx, rx) = mpsc::unbounded_channel();
            self.filters.lock().unwrap().push(filter);
            self.feeds.lock().unwrap().push(tx);
            let stream: ItemStream = Box::pin(UnboundedReceiverStream::new(rx));
            Ok(stream)
        }
        .boxed()
    }
}

/// State whose scorer reads "good" as positive and "bad" as negative.
pub fn test_state() -> (AppState, Arc<MemoryUpstream>) {
    let scorer = |text: &str| {
        if text.contains("good") {
            0.8
        } else if text.contains("bad") {
            -0.8
        } else {
            0.0
        }
    };
    let upstream = Arc::new(MemoryUpstream::default());
    let state = AppState::new(
        ClassificationPolicy::new(Arc::new(scorer)),
        TagMatch::Keyword,
        upstream.clone(),
        64,
    );
    (state, upstream)
}

pub fn tweet(text: &str) -> RawStreamItem {
    RawStreamItem {
        text: text.to_string(),
        extended_text: None,
        author: Author {
            external_id: "7".to_string(),
            display_name: "Seven".to_string(),
            handle: "seven".to_string(),
            avatar_url: "https://pbs.example/seven.jpg".to_string(),
            avatar_url_https: "https://pbs.example/seven.jpg".to_string(),
        },
    }
}

/// Polls the store until `done` holds, failing after two seconds.
pub async fn wait_for(state: &AppState, done: impl Fn(&ModerationSnapshot) -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if done(&state.store.snapshot()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("store never reached the expected state");
}
