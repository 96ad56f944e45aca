//! Knowledge layer: document sources, chunking, embeddings, the corpus
//! snapshot and the retriever the general-knowledge handler queries.

pub mod chunker;
pub mod corpus;
pub mod embedder;
pub mod ingest;
pub mod source;
pub mod store;

use serde::Serialize;

/// A chunk returned by similarity search, with its origin and score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedSnippet {
    pub text: String,
    pub source: String,
    pub score: f32,
}
