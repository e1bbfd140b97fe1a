use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let search_tool = if state.settings.search_credentials().is_some() {
        "available"
    } else {
        "unavailable"
    };

    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "components": {
            "llm": "configured",
            "vector_store": "sqlite",
            "search_tool": search_tool,
        }
    }))
}
