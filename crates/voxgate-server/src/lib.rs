//! voxgate server library logic.

pub mod api_voice;
pub mod base_url;
pub mod call_flow;
pub mod config;
pub mod turn;

use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get},
    Extension, Json, Router,
};
use config::Config;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use voxgate_reply::{CompletionClient, ReplyEngine};

/// Application state shared across all request handlers.
///
/// Read-only after startup; nothing here is mutated per call.
#[derive(Clone)]
pub struct AppState {
    /// Process configuration.
    pub config: Arc<Config>,
    /// Reply generation for caller utterances.
    pub replies: ReplyEngine,
}

impl AppState {
    /// Builds state from configuration, wiring the completion service in
    /// when a credential is configured.
    pub fn from_config(config: Config, http: reqwest::Client) -> Self {
        let completion = config
            .completion_settings()
            .map(|settings| CompletionClient::new(http, settings));
        if completion.is_none() {
            tracing::info!("no completion credential configured, using built-in replies");
        }

        Self {
            config: Arc::new(config),
            replies: ReplyEngine::new(completion),
        }
    }
}

/// Maximum request body size (64 KiB). Carrier webhook bodies are a few
/// hundred bytes.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let voice_routes = Router::new()
        .route(
            call_flow::INCOMING_PATH,
            any(api_voice::incoming_call_handler),
        )
        .route(
            call_flow::CONTINUE_PATH,
            any(api_voice::continue_call_handler),
        )
        .layer(api_voice::error_boundary());

    Router::new()
        .route("/health", get(health))
        .merge(voice_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
