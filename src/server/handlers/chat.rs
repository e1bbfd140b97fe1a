use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::llm::ChatMessage;
use crate::memory::{ROLE_AGENT, ROLE_USER};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessageDto {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequestDto {
    pub question: String,
    #[serde(default)]
    pub history: Vec<MessageDto>,
    #[serde(default = "default_use_rag")]
    pub use_rag: bool,
    #[serde(default)]
    pub use_agent: bool,
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

fn default_use_rag() -> bool {
    true
}

fn default_session_id() -> String {
    "default".to_string()
}

#[derive(Debug, Serialize)]
pub struct ChatResponseDto {
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub metadata: Value,
}

/// Chat endpoint. `use_agent` takes precedence over `use_rag`; with
/// neither set the question goes through the stateless single-call mode.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequestDto>,
) -> Result<impl IntoResponse, ApiError> {
    let question = payload.question.trim().to_string();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Question cannot be empty".to_string()));
    }

    // Seed the session with any history the client carries.
    if !payload.history.is_empty() {
        let session = state.memory.get_session(&payload.session_id);
        let mut session = session.lock().await;
        for message in &payload.history {
            session.append(&message.role, &message.content);
        }
    }

    if payload.use_agent {
        let history = session_chat_history(&state, &payload.session_id).await;
        let outcome = state
            .agent
            .run(&question, &history, &payload.session_id)
            .await;

        {
            let session = state.memory.get_session(&payload.session_id);
            let mut session = session.lock().await;
            session.append(ROLE_USER, &question);
            session.append(ROLE_AGENT, &outcome.answer);
        }

        return Ok(Json(ChatResponseDto {
            answer: outcome.answer,
            sources: None,
            reasoning: outcome.reasoning,
            metadata: outcome.metadata,
        }));
    }

    if payload.use_rag {
        let outcome = state
            .qa_chain
            .get_answer(&question, &payload.session_id)
            .await;
        return Ok(Json(ChatResponseDto {
            answer: outcome.answer,
            sources: Some(outcome.sources),
            reasoning: None,
            metadata: outcome.metadata,
        }));
    }

    let outcome = state.qa_chain.get_simple_answer(&question).await;
    Ok(Json(ChatResponseDto {
        answer: outcome.answer,
        sources: Some(outcome.sources),
        reasoning: None,
        metadata: outcome.metadata,
    }))
}

async fn session_chat_history(state: &AppState, session_id: &str) -> Vec<ChatMessage> {
    let session = state.memory.get_session(session_id);
    let session = session.lock().await;
    session
        .messages()
        .iter()
        .map(|message| {
            if message.role == ROLE_AGENT {
                ChatMessage::assistant(&message.content)
            } else {
                ChatMessage::user(&message.content)
            }
        })
        .collect()
}

pub async fn get_tools(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let infos = state.tools.infos();
    let total_tools = infos.len();
    Json(json!({
        "tools": infos,
        "total_tools": total_tools,
    }))
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store_stats = state.vector_store.stats().await;
    Json(json!({
        "vector_store": store_stats,
        "memory_sessions": state.memory.session_count(),
        "available_tools": state.tools.len(),
    }))
}
