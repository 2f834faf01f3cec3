//! Command handlers for the moderation API.

use crate::AppState;
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tagwatch_moderation::ModerationError;
use tagwatch_types::Language;
use thiserror::Error;

/// Query parameters for `POST /api/watch/{tag}`.
#[derive(Debug, Default, Deserialize)]
pub struct WatchParams {
    /// Two-letter language code; unsupported codes are ignored.
    pub lang: Option<String>,
}

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl From<ModerationError> for ApiError {
    fn from(err: ModerationError) -> Self {
        match err {
            ModerationError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ModerationError::InvalidTag(_) => ApiError::BadRequest(err.to_string()),
            ModerationError::Upstream(_) => ApiError::Upstream(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(json!({
            "status": 0,
            "error": message
        }));

        (status, body).into_response()
    }
}

fn ack() -> Json<Value> {
    Json(json!({ "status": 1 }))
}

fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid tweet id: {raw:?}")))
}

/// Handler for `GET /api/state`.
pub async fn state_handler(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": 1,
        "data": state.store.snapshot()
    }))
}

/// Handler for `GET /api/languages`.
pub async fn languages_handler() -> Json<Value> {
    let languages: Vec<Value> = Language::ALL
        .iter()
        .map(|lang| json!({ "code": lang.code(), "name": lang.name() }))
        .collect();
    Json(json!({
        "status": 1,
        "data": languages
    }))
}

/// Handler for `POST /api/watch/{tag}`.
///
/// Responds with the snapshot after the watch took effect, or the current
/// one if a watch was already running.
pub async fn watch_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(tag): Path<String>,
    Query(params): Query<WatchParams>,
) -> Result<Json<Value>, ApiError> {
    let snapshot = state.watcher.watch(&tag, params.lang.as_deref()).await?;
    Ok(Json(json!({
        "status": 1,
        "data": snapshot
    })))
}

/// Handler for `POST /api/stop`.
pub async fn stop_handler(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    state.watcher.stop().await;
    ack()
}

/// Handler for `POST /api/clear`.
pub async fn clear_handler(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    state.watcher.clear().await;
    ack()
}

/// Handler for `POST /api/tweets/{id}/approve`.
pub async fn approve_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.store.approve(parse_id(&id)?)?;
    Ok(ack())
}

/// Handler for `POST /api/tweets/{id}/reject`.
pub async fn reject_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.store.reject(parse_id(&id)?)?;
    Ok(ack())
}

/// Handler for `DELETE /api/tweets/{id}`.
pub async fn delete_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.store.delete(parse_id(&id)?)?;
    Ok(ack())
}

/// Handler for `POST /api/ai/enable`.
pub async fn enable_ai_handler(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    state.store.enable_ai();
    ack()
}

/// Handler for `POST /api/ai/disable`.
pub async fn disable_ai_handler(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    state.store.disable_ai();
    ack()
}
