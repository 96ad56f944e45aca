use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::llm_client::MODEL;
use crate::state::AppState;

/// GET /health
/// Returns service version, model, corpus availability and session count.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let knowledge_loaded = state.knowledge.snapshot().await.is_some();
    let active_sessions = state.sessions.len().await;

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "hr-assistant",
        "model": MODEL,
        "knowledge_loaded": knowledge_loaded,
        "active_sessions": active_sessions
    }))
}
