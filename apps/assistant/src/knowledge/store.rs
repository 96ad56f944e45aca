//! Knowledge base: the owned handle to the current corpus snapshot, and the
//! retriever that queries it.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::knowledge::corpus::{CorpusError, KnowledgeCorpus};
use crate::knowledge::embedder::{Embedder, EmbeddingError};
use crate::knowledge::RetrievedSnippet;

pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("knowledge corpus is not loaded")]
    Unavailable,

    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("knowledge corpus does not match the embedder: {0}")]
    Incompatible(#[from] CorpusError),
}

/// The vector-store seam: similarity search plus wholesale snapshot replacement.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedSnippet>, RetrievalError>;

    /// Atomically replaces the served corpus and returns the installed snapshot.
    async fn install(&self, corpus: KnowledgeCorpus) -> Arc<KnowledgeCorpus>;
}

#[derive(Debug, Clone, Serialize)]
pub struct CorpusStatus {
    pub loaded: bool,
    pub built_at: Option<DateTime<Utc>>,
    pub dimensions: usize,
    pub chunk_count: usize,
    pub sources: BTreeMap<String, usize>,
}

/// Holds the served snapshot behind an `Arc` so in-flight searches keep the
/// version they started with while a rebuild swaps in the next one.
pub struct KnowledgeBase {
    current: RwLock<Option<Arc<KnowledgeCorpus>>>,
    embedder: Arc<dyn Embedder>,
}

impl KnowledgeBase {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            current: RwLock::new(None),
            embedder,
        }
    }

    pub async fn snapshot(&self) -> Option<Arc<KnowledgeCorpus>> {
        self.current.read().await.clone()
    }

    pub async fn status(&self) -> CorpusStatus {
        match self.snapshot().await {
            Some(corpus) => CorpusStatus {
                loaded: true,
                built_at: Some(corpus.built_at),
                dimensions: corpus.dimensions,
                chunk_count: corpus.len(),
                sources: corpus.sources(),
            },
            None => CorpusStatus {
                loaded: false,
                built_at: None,
                dimensions: 0,
                chunk_count: 0,
                sources: BTreeMap::new(),
            },
        }
    }
}

#[async_trait]
impl VectorStore for KnowledgeBase {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedSnippet>, RetrievalError> {
        let corpus = self.snapshot().await.ok_or(RetrievalError::Unavailable)?;
        if corpus.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let vectors = self.embedder.embed(&[query.to_string()]).await?;
        let query_vector = vectors
            .into_iter()
            .next()
            .ok_or(EmbeddingError::CountMismatch {
                expected: 1,
                got: 0,
            })?;

        Ok(corpus.search(&query_vector, k)?)
    }

    async fn install(&self, corpus: KnowledgeCorpus) -> Arc<KnowledgeCorpus> {
        let corpus = Arc::new(corpus);
        *self.current.write().await = Some(corpus.clone());
        info!(
            "Installed knowledge corpus: {} chunks from {} sources",
            corpus.len(),
            corpus.sources().len()
        );
        corpus
    }
}

/// Thin wrapper fixing the default `k` for handler calls.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    default_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>, default_k: usize) -> Self {
        Self {
            store,
            default_k: default_k.max(1),
        }
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedSnippet>, RetrievalError> {
        self.retrieve_k(query, self.default_k).await
    }

    pub async fn retrieve_k(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedSnippet>, RetrievalError> {
        self.store.search(query, k).await
    }
}
