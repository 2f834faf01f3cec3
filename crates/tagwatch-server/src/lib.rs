//! Tagwatch server library logic.

pub mod api;
pub mod api_sse;
pub mod api_ws;
pub mod config;

use axum::{
    routing::{delete, get, post},
    Extension, Json, Router,
};
use config::{Config, ConfigError};
use serde_json::{json, Value};
use std::sync::Arc;
use tagwatch_moderation::{
    ClassificationPolicy, LexiconScorer, ModerationStore, SentimentScorer, StreamWatcher,
    TagMatch, UpstreamSource, VaderScorer,
};
use tagwatch_twitter::FilteredStreamClient;
use tagwatch_types::ModerationSnapshot;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The moderation queues.
    pub store: Arc<ModerationStore>,
    /// Watch lifecycle over the upstream subscription.
    pub watcher: Arc<StreamWatcher>,
    /// Snapshot broadcast fed by every store mutation.
    pub changes: broadcast::Sender<ModerationSnapshot>,
}

impl AppState {
    /// Wires a store and watcher around `policy` and `upstream`.
    pub fn new(
        policy: ClassificationPolicy,
        tag_match: TagMatch,
        upstream: Arc<dyn UpstreamSource>,
        broadcast_capacity: usize,
    ) -> Self {
        let (changes, _) = broadcast::channel(broadcast_capacity.max(1));
        let store =
            Arc::new(ModerationStore::new(policy, changes.clone()).with_tag_match(tag_match));
        let watcher = Arc::new(StreamWatcher::new(store.clone(), upstream));
        Self {
            store,
            watcher,
            changes,
        }
    }
}

/// Builds the filtered-stream client from the `[twitter]` section.
///
/// # Errors
///
/// Returns [`ConfigError::Upstream`] if the HTTP client cannot be built.
pub fn build_upstream(config: &Config) -> Result<FilteredStreamClient, ConfigError> {
    if !config.twitter.is_configured() {
        tracing::warn!("twitter.bearer_token is not set; watch requests will fail");
    }
    Ok(FilteredStreamClient::new(config.twitter.clone())?)
}

/// Builds the application state from configuration.
///
/// Scores with [`VaderScorer`] unless `moderation.lexicon_path` names a
/// VADER-format lexicon file.
///
/// # Errors
///
/// Returns [`ConfigError::Lexicon`] if `moderation.lexicon_path` is set but
/// cannot be loaded.
pub fn build_state(
    config: &Config,
    upstream: Arc<dyn UpstreamSource>,
) -> Result<AppState, ConfigError> {
    let moderation = &config.moderation;

    let scorer: Arc<dyn SentimentScorer> = match moderation.lexicon_path.as_deref() {
        Some(path) => {
            let lexicon = LexiconScorer::from_file(path)?;
            tracing::info!(path, entries = lexicon.len(), "loaded sentiment lexicon");
            Arc::new(lexicon)
        }
        None => Arc::new(VaderScorer::new()),
    };

    let policy = ClassificationPolicy::new(scorer)
        .with_thresholds(moderation.positive_threshold, moderation.negative_threshold)
        .with_polarity(moderation.polarity);
    tracing::debug!(?policy, tag_match = ?moderation.tag_match, "classification policy");

    Ok(AppState::new(
        policy,
        moderation.tag_match,
        upstream,
        moderation.broadcast_capacity,
    ))
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/state", get(api::state_handler))
        .route("/api/languages", get(api::languages_handler))
        .route("/api/watch/{tag}", post(api::watch_handler))
        .route("/api/stop", post(api::stop_handler))
        .route("/api/clear", post(api::clear_handler))
        .route("/api/tweets/{id}/approve", post(api::approve_handler))
        .route("/api/tweets/{id}/reject", post(api::reject_handler))
        .route("/api/tweets/{id}", delete(api::delete_handler))
        .route("/api/ai/enable", post(api::enable_ai_handler))
        .route("/api/ai/disable", post(api::disable_ai_handler))
        .route("/events/stream", get(api_sse::get_change_stream_handler))
        .route("/ws", get(api_ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
