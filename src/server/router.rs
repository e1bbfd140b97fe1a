use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{chat, health, ingest, sessions};
use crate::state::AppState;

/// Main application router: health, chat, session memory and ingestion
/// surfaces plus CORS and request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    // Leave headroom above the raw file bound for multipart framing.
    let body_limit = state.settings.max_file_size as usize + 64 * 1024;

    Router::new()
        .route("/", get(health::health))
        .route("/health", get(health::health))
        .route("/chat", post(chat::chat))
        .route("/chat/tools", get(chat::get_tools))
        .route("/chat/stats", get(chat::get_stats))
        .route(
            "/chat/memory/:session_id",
            get(sessions::get_memory).delete(sessions::clear_memory),
        )
        .route("/ingest/upload", post(ingest::upload_document))
        .route("/ingest/directory", post(ingest::ingest_directory))
        .route("/ingest/stats", get(ingest::get_stats))
        .route("/ingest/clear", delete(ingest::clear_documents))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
