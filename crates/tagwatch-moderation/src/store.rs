//! The moderation queues and every operation that mutates them.

use crate::error::ModerationError;
use crate::ids::IdAllocator;
use crate::policy::ClassificationPolicy;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tagwatch_types::{Language, ModerationSnapshot, Queue, RawStreamItem, TweetRecord};
use tokio::sync::broadcast;

/// Marker that starts a canonical tag.
const TAG_MARKER: char = '#';

/// First token of a retweet's raw text.
const RETWEET_MARKER: &str = "RT";

/// Returns `input` with surrounding whitespace removed and a leading `#`.
///
/// # Errors
///
/// Returns [`ModerationError::InvalidTag`] if nothing but the marker remains.
pub fn canonical_tag(input: &str) -> Result<String, ModerationError> {
    let trimmed = input.trim();
    if trimmed.trim_start_matches(TAG_MARKER).is_empty() {
        return Err(ModerationError::InvalidTag(input.to_string()));
    }
    if trimmed.starts_with(TAG_MARKER) {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{TAG_MARKER}{trimmed}"))
    }
}

/// How an item's text must mention the watched tag to be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagMatch {
    /// The tag keyword must appear, with or without the `#` marker.
    #[default]
    Keyword,
    /// The tag must appear with its `#` marker.
    Marked,
}

impl TagMatch {
    /// Case-insensitive substring test of `text` against the canonical `tag`.
    fn matches(self, tag: &str, text: &str) -> bool {
        let needle = match self {
            Self::Keyword => tag.trim_start_matches(TAG_MARKER),
            Self::Marked => tag,
        };
        text.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// `RT` at the start of the text, not followed by a letter or digit:
/// `RT @x`, `RT: ..` and `RT@x` are retweets, `RTX launch` is not.
fn is_retweet(text: &str) -> bool {
    text.trim_start()
        .strip_prefix(RETWEET_MARKER)
        .is_some_and(|rest| !rest.starts_with(char::is_alphanumeric))
}

/// The mutable aggregate. Only reachable through [`ModerationStore`]'s lock.
#[derive(Debug, Default)]
struct State {
    tag: String,
    language: Option<Language>,
    watching: bool,
    ai_enabled: bool,
    pending: VecDeque<TweetRecord>,
    approved: VecDeque<TweetRecord>,
    rejected: VecDeque<TweetRecord>,
    ids: IdAllocator,
    /// Incremented by every watch; ingestion for an older session is dropped.
    session: u64,
}

impl State {
    fn queue_mut(&mut self, queue: Queue) -> &mut VecDeque<TweetRecord> {
        match queue {
            Queue::Pending => &mut self.pending,
            Queue::Approved => &mut self.approved,
            Queue::Rejected => &mut self.rejected,
        }
    }

    fn queue(&self, queue: Queue) -> &VecDeque<TweetRecord> {
        match queue {
            Queue::Pending => &self.pending,
            Queue::Approved => &self.approved,
            Queue::Rejected => &self.rejected,
        }
    }

    /// Removes the record with `id` from the first queue in `order` holding it.
    fn take(&mut self, id: u64, order: &[Queue]) -> Option<(Queue, TweetRecord)> {
        order.iter().find_map(|&queue| {
            let records = self.queue_mut(queue);
            let pos = records.iter().position(|r| r.id == id)?;
            records.remove(pos).map(|record| (queue, record))
        })
    }

    /// Places a record at its queue's insertion end. Pending keeps arrival
    /// order; approved and rejected keep the most recent first.
    fn place(&mut self, queue: Queue, record: TweetRecord) {
        match queue {
            Queue::Pending => self.pending.push_back(record),
            Queue::Approved => self.approved.push_front(record),
            Queue::Rejected => self.rejected.push_front(record),
        }
    }

    fn snapshot(&self) -> ModerationSnapshot {
        ModerationSnapshot {
            tag: self.tag.clone(),
            language: self.language,
            watching: self.watching,
            ai_enabled: self.ai_enabled,
            pending: self.pending.iter().cloned().collect(),
            approved: self.approved.iter().cloned().collect(),
            rejected: self.rejected.iter().cloned().collect(),
        }
    }
}

/// Owns the three moderation queues.
///
/// Every operation takes the store's lock, mutates, broadcasts the resulting
/// snapshot, and only then releases the lock, so the broadcast order is the
/// mutation order. Lock hold times are bounded by a queue scan.
#[derive(Debug)]
pub struct ModerationStore {
    state: Mutex<State>,
    policy: ClassificationPolicy,
    tag_match: TagMatch,
    changes: broadcast::Sender<ModerationSnapshot>,
}

impl ModerationStore {
    /// Creates an empty store that announces changes on `changes`.
    pub fn new(policy: ClassificationPolicy, changes: broadcast::Sender<ModerationSnapshot>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            policy,
            tag_match: TagMatch::default(),
            changes,
        }
    }

    pub fn with_tag_match(mut self, tag_match: TagMatch) -> Self {
        self.tag_match = tag_match;
        self
    }

    /// Subscribes to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ModerationSnapshot> {
        self.changes.subscribe()
    }

    pub fn snapshot(&self) -> ModerationSnapshot {
        self.lock().snapshot()
    }

    pub fn is_watching(&self) -> bool {
        self.lock().watching
    }

    pub fn ai_enabled(&self) -> bool {
        self.lock().ai_enabled
    }

    /// Returns the queue currently holding `id`, if any.
    pub fn locate(&self, id: u64) -> Option<Queue> {
        let state = self.lock();
        [Queue::Pending, Queue::Approved, Queue::Rejected]
            .into_iter()
            .find(|&q| state.queue(q).iter().any(|r| r.id == id))
    }

    /// Moves `id` to the front of the approved queue.
    ///
    /// Pending is searched before rejected.
    ///
    /// # Errors
    ///
    /// [`ModerationError::NotFound`] if neither queue holds `id`. Nothing is
    /// broadcast in that case.
    pub fn approve(&self, id: u64) -> Result<(), ModerationError> {
        self.move_to(id, Queue::Approved, &[Queue::Pending, Queue::Rejected])
    }

    /// Moves `id` to the front of the rejected queue.
    ///
    /// Pending is searched before approved.
    ///
    /// # Errors
    ///
    /// [`ModerationError::NotFound`] if neither queue holds `id`.
    pub fn reject(&self, id: u64) -> Result<(), ModerationError> {
        self.move_to(id, Queue::Rejected, &[Queue::Pending, Queue::Approved])
    }

    /// Removes `id` from whichever queue holds it, searching pending, then
    /// approved, then rejected.
    ///
    /// # Errors
    ///
    /// [`ModerationError::NotFound`] if no queue holds `id`.
    pub fn delete(&self, id: u64) -> Result<(), ModerationError> {
        let mut state = self.lock();
        let (from, _) = state
            .take(id, &[Queue::Pending, Queue::Approved, Queue::Rejected])
            .ok_or(ModerationError::NotFound(id))?;
        tracing::info!(id, from = from.as_str(), "deleted tweet");
        self.emit(&state);
        Ok(())
    }

    /// Turns automatic triage on for items ingested from now on.
    pub fn enable_ai(&self) {
        self.set_ai_enabled(true);
    }

    /// Turns automatic triage off. Existing queue membership is untouched.
    pub fn disable_ai(&self) {
        self.set_ai_enabled(false);
    }

    fn set_ai_enabled(&self, enabled: bool) {
        let mut state = self.lock();
        state.ai_enabled = enabled;
        tracing::info!(ai_enabled = enabled, "updated automatic triage");
        self.emit(&state);
    }

    fn move_to(&self, id: u64, to: Queue, search: &[Queue]) -> Result<(), ModerationError> {
        let mut state = self.lock();
        // The record leaves its source queue before it is placed anywhere.
        let (from, record) = state.take(id, search).ok_or(ModerationError::NotFound(id))?;
        state.place(to, record);
        tracing::info!(id, from = from.as_str(), to = to.as_str(), "moved tweet");
        self.emit(&state);
        Ok(())
    }

    // ── session lifecycle, driven by the watcher ─────────────────────

    /// Activates ingestion for `tag` and returns the new session number.
    pub(crate) fn begin_session(&self, tag: String, language: Option<Language>) -> u64 {
        let mut state = self.lock();
        state.session += 1;
        state.tag = tag;
        state.language = language;
        state.watching = true;
        self.emit(&state);
        state.session
    }

    /// Deactivates ingestion if `session` is still the live one, or
    /// unconditionally when `session` is `None`. Queues are preserved.
    ///
    /// Returns `true` if the store was watching.
    pub(crate) fn end_session(&self, session: Option<u64>) -> bool {
        let mut state = self.lock();
        if !state.watching || session.is_some_and(|s| s != state.session) {
            return false;
        }
        state.watching = false;
        self.emit(&state);
        true
    }

    /// Stops ingestion, empties all queues, restarts ids and turns triage
    /// off. Tag and language are kept.
    pub(crate) fn reset(&self) {
        let mut state = self.lock();
        state.watching = false;
        state.ai_enabled = false;
        state.pending.clear();
        state.approved.clear();
        state.rejected.clear();
        state.ids.reset();
        self.emit(&state);
    }

    /// Filters, records, classifies and stores one upstream item.
    ///
    /// Items from a session that is no longer live are dropped, which is
    /// what keeps a stopped subscription from mutating state. Returns the
    /// queue the new record landed in.
    pub(crate) fn ingest(&self, session: u64, item: &RawStreamItem) -> Option<(u64, Queue)> {
        let mut state = self.lock();
        if !state.watching || state.session != session {
            tracing::trace!(session, "dropping item from inactive session");
            return None;
        }
        if is_retweet(&item.text) {
            tracing::trace!("dropping retweet");
            return None;
        }
        if !self.tag_match.matches(&state.tag, &item.text) {
            tracing::trace!(tag = %state.tag, "dropping item without tag");
            return None;
        }

        let record = TweetRecord {
            id: state.ids.next_id(),
            text: item.display_text().to_string(),
            author: item.author.clone(),
        };
        let id = record.id;
        let queue = self.policy.classify(&record, state.ai_enabled);
        state.place(queue, record);
        tracing::debug!(id, queue = queue.as_str(), "ingested tweet");
        self.emit(&state);
        Some((id, queue))
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // No mutation spans a panic point; a poisoned guard is still valid.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, state: &State) {
        // No receivers is normal between observer connections.
        let _ = self.changes.send(state.snapshot());
    }
}
