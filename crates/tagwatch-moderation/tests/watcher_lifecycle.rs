//! Watch lifecycle tests driven through an in-memory upstream.

use futures_util::FutureExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tagwatch_moderation::{
    ClassificationPolicy, ItemStream, ModerationError, ModerationStore, StreamFilter,
    StreamWatcher, UpstreamError, UpstreamSource,
};
use tagwatch_types::{Author, Language, ModerationSnapshot, Queue, RawStreamItem};
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;

type Feed = mpsc::UnboundedSender<Result<RawStreamItem, UpstreamError>>;

/// Hands out one channel per subscription and remembers the filters used.
#[derive(Default)]
struct MemoryUpstream {
    filters: Mutex<Vec<StreamFilter>>,
    feeds: Mutex<Vec<Feed>>,
    refuse: AtomicBool,
}

impl MemoryUpstream {
    fn feed(&self) -> Feed {
        self.feeds.lock().unwrap().last().cloned().expect("no subscription opened")
    }

    /// Drops every sender so open streams end.
    fn disconnect(&self) {
        self.feeds.lock().unwrap().clear();
    }

    fn opened(&self) -> Vec<StreamFilter> {
        self.filters.lock().unwrap().clone()
    }
}

impl UpstreamSource for MemoryUpstream {
    fn open(
        &self,
        filter: StreamFilter,
    ) -> futures_util::future::BoxFuture<'_, Result<ItemStream, UpstreamError>> {
        async move {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(UpstreamError::Status {
                    status: 401,
                    body: "unauthorized".to_string(),
                });
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

struct Harness {
    upstream: Arc<MemoryUpstream>,
    store: Arc<ModerationStore>,
    watcher: StreamWatcher,
    changes: broadcast::Receiver<ModerationSnapshot>,
}

fn harness() -> Harness {
    let (tx, changes) = broadcast::channel(256);
    let policy = ClassificationPolicy::new(Arc::new(|_: &str| 0.0));
    let store = Arc::new(ModerationStore::new(policy, tx));
    let upstream = Arc::new(MemoryUpstream::default());
    let watcher = StreamWatcher::new(store.clone(), upstream.clone());
    Harness {
        upstream,
        store,
        watcher,
        changes,
    }
}

fn tweet(text: &str) -> RawStreamItem {
    RawStreamItem {
        text: text.to_string(),
        extended_text: None,
        author: Author {
            external_id: "7".to_string(),
            display_name: "Seven".to_string(),
            handle: "seven".to_string(),
            avatar_url: "http://img/7.png".to_string(),
            avatar_url_https: "https://img/7.png".to_string(),
        },
    }
}

/// Waits for the next broadcast snapshot satisfying `pred`.
async fn next_change(
    rx: &mut broadcast::Receiver<ModerationSnapshot>,
    pred: impl Fn(&ModerationSnapshot) -> bool,
) -> ModerationSnapshot {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Ok(snap) if pred(&snap) => return snap,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("change channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for change")
}

fn drain(rx: &mut broadcast::Receiver<ModerationSnapshot>) {
    while rx.try_recv().is_ok() {}
}

#[tokio::test]
async fn demo_scenario_end_to_end() {
    let mut h = harness();

    let snap = h.watcher.watch("demo", None).await.unwrap();
    assert_eq!(snap.tag, "#demo");
    assert!(snap.watching);
    assert_eq!(h.upstream.opened()[0].track, "#demo");

    h.upstream.feed().send(Ok(tweet("demo hello world"))).unwrap();
    let snap = next_change(&mut h.changes, |s| !s.pending.is_empty()).await;
    assert_eq!(snap.pending.len(), 1);
    assert_eq!(snap.pending[0].id, 1);
    assert_eq!(snap.pending[0].text, "demo hello world");

    h.store.approve(1).unwrap();
    let snap = h.store.snapshot();
    assert_eq!(snap.approved.len(), 1);
    assert_eq!(snap.approved[0].id, 1);
    assert!(snap.pending.is_empty());

    h.store.delete(1).unwrap();
    assert!(h.store.snapshot().approved.is_empty());
}

#[tokio::test]
async fn rewatch_is_a_silent_no_op() {
    let mut h = harness();
    h.watcher.watch("demo", None).await.unwrap();
    drain(&mut h.changes);

    let snap = h.watcher.watch("other", Some("en")).await.unwrap();
    assert_eq!(snap.tag, "#demo");
    assert_eq!(h.upstream.opened().len(), 1);
    assert!(h.changes.try_recv().is_err());
}

#[tokio::test]
async fn language_filter_is_validated() {
    let h = harness();
    let snap = h.watcher.watch("#demo", Some("pt")).await.unwrap();
    assert_eq!(snap.language, Some(Language::Portuguese));
    assert_eq!(h.upstream.opened()[0].language, Some(Language::Portuguese));
    h.watcher.stop().await;

    let snap = h.watcher.watch("#demo", Some("klingon")).await.unwrap();
    assert!(snap.watching);
    assert_eq!(snap.language, None);
    assert_eq!(h.upstream.opened()[1].language, None);
}

#[tokio::test]
async fn stop_halts_ingestion_and_keeps_queues() {
    let mut h = harness();
    h.watcher.watch("demo", None).await.unwrap();
    let feed = h.upstream.feed();
    feed.send(Ok(tweet("#demo first"))).unwrap();
    next_change(&mut h.changes, |s| s.pending.len() == 1).await;

    assert!(h.watcher.stop().await);
    let snap = next_change(&mut h.changes, |s| !s.watching).await;
    assert_eq!(snap.pending.len(), 1);

    // The feed may already be closed; either way nothing may land.
    let _ = feed.send(Ok(tweet("#demo late")));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.store.snapshot().pending.len(), 1);

    assert!(!h.watcher.stop().await);
}

#[tokio::test]
async fn clear_requires_a_prior_watch() {
    let mut h = harness();
    assert!(!h.watcher.clear().await);
    assert!(h.changes.try_recv().is_err());
}

#[tokio::test]
async fn clear_resets_queues_and_ids() {
    let mut h = harness();
    h.watcher.watch("demo", Some("en")).await.unwrap();
    h.store.enable_ai();
    h.store.disable_ai();
    h.store.enable_ai();
    for text in ["#demo a", "#demo b"] {
        h.upstream.feed().send(Ok(tweet(text))).unwrap();
    }
    next_change(&mut h.changes, |s| s.pending.len() == 2).await;

    assert!(h.watcher.clear().await);
    let snap = h.store.snapshot();
    assert!(snap.is_empty());
    assert!(!snap.watching);
    assert!(!snap.ai_enabled);
    assert_eq!(snap.tag, "#demo");
    assert_eq!(snap.language, Some(Language::English));

    h.watcher.watch("demo", None).await.unwrap();
    h.upstream.feed().send(Ok(tweet("#demo after clear"))).unwrap();
    let snap = next_change(&mut h.changes, |s| !s.pending.is_empty()).await;
    assert_eq!(snap.pending[0].id, 1);
}

#[tokio::test]
async fn disconnect_stops_the_session() {
    let mut h = harness();
    h.watcher.watch("demo", None).await.unwrap();
    drain(&mut h.changes);

    h.upstream.disconnect();
    next_change(&mut h.changes, |s| !s.watching).await;
    assert!(!h.store.is_watching());
    assert!(!h.watcher.stop().await);

    // A new watch opens a fresh subscription.
    h.watcher.watch("demo", None).await.unwrap();
    assert_eq!(h.upstream.opened().len(), 2);
    assert!(h.store.is_watching());
}

#[tokio::test]
async fn upstream_error_stops_the_session() {
    let mut h = harness();
    h.watcher.watch("demo", None).await.unwrap();
    h.upstream
        .feed()
        .send(Err(UpstreamError::Disconnected("reset by peer".to_string())))
        .unwrap();
    next_change(&mut h.changes, |s| !s.watching).await;
}

#[tokio::test]
async fn failed_open_leaves_state_untouched() {
    let mut h = harness();
    h.upstream.refuse.store(true, Ordering::SeqCst);

    let err = h.watcher.watch("demo", None).await.unwrap_err();
    assert!(matches!(err, ModerationError::Upstream(UpstreamError::Status { status: 401, .. })));
    assert!(!h.store.is_watching());
    assert!(h.changes.try_recv().is_err());
    assert!(!h.watcher.clear().await);
}

#[tokio::test]
async fn empty_tag_is_rejected() {
    let h = harness();
    let err = h.watcher.watch("  ", None).await.unwrap_err();
    assert!(matches!(err, ModerationError::InvalidTag(_)));
    assert!(h.upstream.opened().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn commands_race_with_ingestion() {
    let h = harness();
    h.watcher.watch("demo", None).await.unwrap();
    let feed = h.upstream.feed();

    const TOTAL: u64 = 200;
    for n in 0..TOTAL {
        feed.send(Ok(tweet(&format!("#demo {n}")))).unwrap();
    }

    let mut workers = Vec::new();
    for worker in 0..4u64 {
        let store = h.store.clone();
        workers.push(tokio::spawn(async move {
            for id in 1..=TOTAL {
                let _ = match (id + worker) % 3 {
                    0 => store.approve(id),
                    1 => store.reject(id),
                    _ => Ok(()),
                };
                tokio::task::yield_now().await;
            }
        }));
    }
    for w in workers {
        w.await.unwrap();
    }

    tokio::time::timeout(Duration::from_secs(5), async {
        while h.store.snapshot().len() < TOTAL as usize {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("ingestion did not finish");

    let snap = h.store.snapshot();
    let mut seen: Vec<u64> = snap
        .pending
        .iter()
        .chain(&snap.approved)
        .chain(&snap.rejected)
        .map(|r| r.id)
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (1..=TOTAL).collect::<Vec<_>>());
    for id in 1..=TOTAL {
        assert!(matches!(
            h.store.locate(id),
            Some(Queue::Pending | Queue::Approved | Queue::Rejected)
        ));
    }
}
