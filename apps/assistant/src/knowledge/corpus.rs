//! Immutable knowledge corpus snapshot with brute-force cosine search.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::knowledge::RetrievedSnippet;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Embedding dimension mismatch in {source_label}: expected {expected}, got {got}")]
    DimensionMismatch {
        source_label: String,
        expected: usize,
        got: usize,
    },

    #[error("Query has {got} dimensions, corpus has {expected}")]
    QueryDimensions { expected: usize, got: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub text: String,
    pub source: String,
    pub embedding: Vec<f32>,
}

/// One fully built corpus version. Never mutated after construction; a
/// rebuild produces a new value that replaces this one wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeCorpus {
    pub built_at: DateTime<Utc>,
    pub dimensions: usize,
    /// Model that produced the embeddings; absent in snapshots that predate it.
    #[serde(default)]
    pub embedding_model: Option<String>,
    chunks: Vec<IndexedChunk>,
}

impl KnowledgeCorpus {
    pub fn new(chunks: Vec<IndexedChunk>) -> Result<Self, CorpusError> {
        let dimensions = chunks.first().map(|c| c.embedding.len()).unwrap_or(0);
        let corpus = Self {
            built_at: Utc::now(),
            dimensions,
            embedding_model: None,
            chunks,
        };
        corpus.validate()?;
        Ok(corpus)
    }

    pub fn empty() -> Self {
        Self {
            built_at: Utc::now(),
            dimensions: 0,
            embedding_model: None,
            chunks: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    /// Every chunk must carry exactly `dimensions` values.
    fn validate(&self) -> Result<(), CorpusError> {
        match self.chunks.iter().find(|c| c.embedding.len() != self.dimensions) {
            Some(bad) => Err(CorpusError::DimensionMismatch {
                source_label: bad.source.clone(),
                expected: self.dimensions,
                got: bad.embedding.len(),
            }),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk count per source document.
    pub fn sources(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for chunk in &self.chunks {
            *counts.entry(chunk.source.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Top-`k` chunks by cosine similarity, most similar first. A query from
    /// a different embedding space is an error, not an empty result.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedSnippet>, CorpusError> {
        if k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(CorpusError::QueryDimensions {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .chunks
            .iter()
            .map(|c| (cosine_similarity(query, &c.embedding), c))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, c)| RetrievedSnippet {
                text: c.text.clone(),
                source: c.source.clone(),
                score,
            })
            .collect())
    }

    /// Writes the snapshot next to `path` and renames it into place, so a
    /// reader never observes a half-written file.
    pub fn save(&self, path: &Path) -> Result<(), CorpusError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut file, self)?;
        file.flush()?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| CorpusError::Io(e.error))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let bytes = std::fs::read(path)?;
        let corpus: Self = serde_json::from_slice(&bytes)?;
        corpus.validate()?;
        Ok(corpus)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
