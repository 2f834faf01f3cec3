//! Moderation pipeline for tagwatch.
//!
//! Items arrive from a live upstream subscription filtered by a tag, are
//! triaged into one of three queues, and can then be moved between queues by
//! external commands. Every mutation broadcasts a full
//! [`ModerationSnapshot`](tagwatch_types::ModerationSnapshot).
//!
//! # Components
//!
//! | Component | Role |
//! |-----------|------|
//! | [`normalize`] | Cleans text before it is scored |
//! | [`ClassificationPolicy`] | Picks the queue for a new record |
//! | [`VaderScorer`], [`LexiconScorer`] | Compound polarity of normalized text |
//! | [`IdAllocator`] | Session-local monotonic ids |
//! | [`ModerationStore`] | Owns the queues; the only place state is mutated |
//! | [`StreamWatcher`] | Watch lifecycle and the ingestion task |
//!
//! # Concurrency
//!
//! The store serializes every mutation behind one lock, and broadcasts the
//! resulting snapshot before releasing it. Ingestion and commands can
//! therefore race freely: observers see snapshots in mutation order and no
//! update is lost.
//!
//! ```rust,ignore
//! let (tx, _) = tokio::sync::broadcast::channel(256);
//! let store = Arc::new(ModerationStore::new(policy, tx));
//! let watcher = StreamWatcher::new(store.clone(), upstream);
//!
//! watcher.watch("rustlang", Some("en")).await?;
//! store.approve(1)?;
//! ```

mod error;
mod ids;
mod lexicon;
mod normalize;
mod policy;
mod store;
mod vader;
mod watcher;

pub use error::{LexiconError, ModerationError, UpstreamError};
pub use ids::IdAllocator;
pub use lexicon::LexiconScorer;
pub use normalize::normalize;
pub use policy::{ClassificationPolicy, Polarity, SentimentScorer};
pub use store::{canonical_tag, ModerationStore, TagMatch};
pub use vader::VaderScorer;
pub use watcher::{ItemStream, StreamFilter, StreamWatcher, UpstreamSource};
