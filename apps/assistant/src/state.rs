use std::sync::Arc;

use crate::chat::orchestrator::Orchestrator;
use crate::chat::session::SessionStore;
use crate::config::Config;
use crate::knowledge::ingest::Indexer;
use crate::knowledge::store::{KnowledgeBase, Retriever};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub sessions: Arc<SessionStore>,
    /// The served corpus snapshot; also the vector store behind the retriever.
    pub knowledge: Arc<KnowledgeBase>,
    pub retriever: Retriever,
    pub indexer: Arc<Indexer>,
    pub config: Config,
}
