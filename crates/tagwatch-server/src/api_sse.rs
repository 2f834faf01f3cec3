//! SSE change stream handler.

use crate::AppState;
use axum::{
    extract::Extension,
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
};
use futures_util::Stream;
use std::{convert::Infallible, sync::Arc};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;

/// Handler for `GET /events/stream`.
///
/// Sends the current snapshot first, then one `change` event per store
/// mutation. A subscriber that falls behind is resynced with a fresh
/// snapshot instead of the events it missed.
pub async fn get_change_stream_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.changes.subscribe();
    let initial = state.store.snapshot();
    let store = state.store.clone();

    let updates = BroadcastStream::new(rx).map(move |result| match result {
        Ok(snapshot) => snapshot,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "change SSE stream lagged; resyncing subscriber");
            store.snapshot()
        }
    });

    let events = tokio_stream::once(initial)
        .chain(updates)
        .filter_map(|snapshot| match Event::default().event("change").json_data(&snapshot) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::error!("failed to serialize change event: {}", e);
                None
            }
        });

    Sse::new(events).keep_alive(KeepAlive::default())
}
