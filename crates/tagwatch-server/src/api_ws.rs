//! WebSocket change feed.

use crate::AppState;
use axum::{
    extract::{
        ws::{Message as AxumMessage, WebSocket},
        Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tagwatch_types::ModerationSnapshot;
use tokio::sync::broadcast::error::RecvError;

/// Outgoing message envelope.
#[derive(Debug, Serialize)]
struct ChangeMessage<'a> {
    event: &'static str,
    data: &'a ModerationSnapshot,
}

fn encode(snapshot: &ModerationSnapshot) -> Option<String> {
    let message = ChangeMessage {
        event: "change",
        data: snapshot,
    };
    match serde_json::to_string(&message) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("failed to serialize change message: {}", e);
            None
        }
    }
}

/// Handler for `GET /ws`.
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Pushes snapshots to the client until either side goes away.
///
/// Incoming frames are read only to notice the close; the feed is one-way.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut rx = state.changes.subscribe();
    let store = state.store.clone();

    let send_task = tokio::spawn(async move {
        let mut pending = Some(store.snapshot());
        loop {
            let snapshot = match pending.take() {
                Some(snapshot) => snapshot,
                None => match rx.recv().await {
                    Ok(snapshot) => snapshot,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "websocket observer lagged; resyncing");
                        store.snapshot()
                    }
                    Err(RecvError::Closed) => break,
                },
            };
            let Some(json) = encode(&snapshot) else {
                continue;
            };
            if sender.send(AxumMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        if let AxumMessage::Close(_) = msg {
            break;
        }
    }

    send_task.abort();
    tracing::debug!("websocket observer disconnected");
}
