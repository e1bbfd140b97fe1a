use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn get_memory(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = state.memory.get_session(&session_id);
    let session = session.lock().await;
    let messages: Vec<_> = session
        .messages()
        .iter()
        .map(|message| {
            json!({
                "role": message.role,
                "content": message.content,
                "created_at": message.created_at,
            })
        })
        .collect();

    Json(json!({
        "session_id": session_id,
        "message_count": messages.len(),
        "messages": messages,
    }))
}

pub async fn clear_memory(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    state.memory.clear(&session_id);
    Json(json!({
        "message": format!("Memory cleared for session: {}", session_id),
    }))
}
