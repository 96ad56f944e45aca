use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::chat::handlers::HandlerError;
use crate::chat::orchestrator::TurnError;
use crate::knowledge::ingest::IngestError;
use crate::knowledge::store::RetrievalError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),
}

impl From<TurnError> for AppError {
    fn from(e: TurnError) -> Self {
        match e {
            TurnError::EmptyMessage => AppError::Validation(e.to_string()),
            TurnError::Classification(e) => AppError::Classification(e.to_string()),
            TurnError::Handler(HandlerError::Retrieval(e)) => AppError::Retrieval(e),
            TurnError::Handler(e) => AppError::Llm(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Classification(msg) => {
                tracing::error!("Classification error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "CLASSIFICATION_ERROR",
                    "The request could not be classified".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Retrieval(RetrievalError::Unavailable) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "KNOWLEDGE_UNAVAILABLE",
                "The knowledge base is not loaded yet".to_string(),
            ),
            AppError::Retrieval(e) => {
                tracing::error!("Retrieval error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "RETRIEVAL_ERROR",
                    "Knowledge search failed".to_string(),
                )
            }
            AppError::Ingest(e) => {
                tracing::error!("Ingestion error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INGEST_ERROR",
                    "Rebuilding the knowledge base failed".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
