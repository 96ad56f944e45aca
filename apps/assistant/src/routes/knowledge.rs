//! Axum route handlers for the Knowledge API.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::knowledge::store::CorpusStatus;
use crate::knowledge::RetrievedSnippet;
use crate::state::AppState;

const MAX_SEARCH_K: usize = 50;

#[derive(Debug, Serialize)]
pub struct KnowledgeStatusResponse {
    pub source: String,
    #[serde(flatten)]
    pub status: CorpusStatus,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<RetrievedSnippet>,
}

/// GET /api/v1/knowledge/status
pub async fn handle_status(State(state): State<AppState>) -> Json<KnowledgeStatusResponse> {
    Json(KnowledgeStatusResponse {
        source: state.indexer.source_description(),
        status: state.knowledge.status().await,
    })
}

/// POST /api/v1/knowledge/reindex
///
/// Rebuilds the corpus from the document source and swaps it in once complete.
/// Searches keep hitting the previous snapshot until then.
pub async fn handle_reindex(
    State(state): State<AppState>,
) -> Result<Json<KnowledgeStatusResponse>, AppError> {
    info!("Reindex requested");
    state.indexer.rebuild().await?;

    Ok(Json(KnowledgeStatusResponse {
        source: state.indexer.source_description(),
        status: state.knowledge.status().await,
    }))
}

/// GET /api/v1/knowledge/search?q=&k=
pub async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(AppError::Validation("q cannot be empty".to_string()));
    }
    let k = params
        .k
        .unwrap_or(state.config.retrieval_k)
        .clamp(1, MAX_SEARCH_K);

    let results = state.retriever.retrieve_k(query, k).await?;
    Ok(Json(SearchResponse {
        query: query.to_string(),
        results,
    }))
}
