use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::chat::{
    ChatTurn, ErrorCategory, GenerateOptions, GenerationFailure, context::normalize_history,
};

use super::{
    AppState,
    error::ApiError,
    session::{Session, SessionSummary},
};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    /// `null` and absent both mean an empty conversation.
    #[serde(default)]
    pub history: Option<Vec<Value>>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub reply: String,
    pub session_id: String,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn socratic_chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(ChatRequest {
        message,
        history,
        session_id,
        api_key,
    }) = payload.map_err(|rejection| {
        log::warn!("rejecting malformed chat request: {}", rejection.body_text());
        GenerationFailure::new(
            ErrorCategory::InvalidRequest,
            format!("Invalid request body: {}", rejection.body_text()),
        )
    })?;

    let message = message.unwrap_or_default();
    let mut history = history.unwrap_or_default();

    // the UI appends the pending message to the history it sends
    if history.last().is_some_and(|last| is_pending(last, &message)) {
        history.pop();
    }

    let options = GenerateOptions {
        credential: api_key,
        ..Default::default()
    };

    let generation = tokio::time::timeout(
        state.chat_timeout,
        state
            .gateway
            .generate(&history, &message, Some(state.system_prompt.as_str()), options),
    )
    .await
    .map_err(|_| {
        log::error!("chat turn timed out after {:?}", state.chat_timeout);
        GenerationFailure::new(ErrorCategory::Unknown, "AI service timed out.")
    })??;

    let session_id = session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let mut messages = normalize_history(&history);
    messages.push(ChatTurn::user(message));
    messages.push(ChatTurn::assistant(generation.text.clone()));

    if let Err(why) = state.sessions.save(&session_id, messages).await {
        log::error!("could not persist session {session_id}: {why:?}");
    }

    Ok(Json(ChatReply {
        reply: generation.text,
        session_id,
    }))
}

fn is_pending(turn: &Value, message: &str) -> bool {
    turn.get("role").and_then(Value::as_str) == Some("user")
        && turn.get("content").and_then(Value::as_str) == Some(message)
}

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    Ok(Json(state.sessions.list().await?))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    state
        .sessions
        .get(&session_id)
        .await?
        .map(Json)
        .ok_or(ApiError::SessionNotFound(session_id))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    match state.sessions.delete(&session_id).await? {
        true => Ok(StatusCode::NO_CONTENT),
        false => Err(ApiError::SessionNotFound(session_id)),
    }
}
