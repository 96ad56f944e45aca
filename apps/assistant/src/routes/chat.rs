//! Axum route handlers for the Chat API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::classifier::RequestType;
use crate::chat::history::ConversationHistory;
use crate::chat::session::run_turn;
use crate::errors::AppError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<Uuid>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub answer: String,
    pub is_error: bool,
    pub history: ConversationHistory,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub request_type: RequestType,
    pub employee_code: Option<String>,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub session_id: Uuid,
    pub history: ConversationHistory,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/chat
///
/// Runs one turn in the given session (a new one when `session_id` is absent).
/// Turn failures come back as a marked error reply, not an HTTP error.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if request.message.trim().is_empty() {
        return Err(AppError::Validation("message cannot be empty".to_string()));
    }

    let (session_id, session) = state.sessions.open(request.session_id).await;
    let mut history = session.lock().await;
    let reply = run_turn(&state.orchestrator, &mut history, &request.message).await;

    Ok(Json(ChatResponse {
        session_id,
        answer: reply.answer,
        is_error: reply.is_error,
        history: history.clone(),
    }))
}

/// POST /api/v1/chat/classify
pub async fn handle_classify(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, AppError> {
    let (intent, answer) = state.orchestrator.classify_only(&request.message).await?;

    Ok(Json(ClassifyResponse {
        request_type: intent.request_type,
        employee_code: intent.employee_code,
        answer: answer.answer,
    }))
}

/// GET /api/v1/chat/:session_id/history
pub async fn handle_get_history(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, AppError> {
    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("session {session_id}")))?;
    let history = session.lock().await.clone();

    Ok(Json(HistoryResponse {
        session_id,
        history,
    }))
}

/// DELETE /api/v1/chat/:session_id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.sessions.remove(session_id).await {
        return Err(AppError::NotFound(format!("session {session_id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}
