//! Corpus building: fetch → decode → split (bounded parallel, per document),
//! then embed in batches and hand the finished snapshot to the vector store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::knowledge::chunker::{Chunk, TextSplitter};
use crate::knowledge::corpus::{CorpusError, IndexedChunk, KnowledgeCorpus};
use crate::knowledge::embedder::{Embedder, EmbeddingError};
use crate::knowledge::source::{decode_text, is_supported, DocumentSource, SourceError};
use crate::knowledge::store::VectorStore;

pub const EMBED_BATCH_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("document source error: {0}")]
    Source(#[from] SourceError),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("snapshot task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub struct CorpusBuilder {
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
    workers: usize,
    batch_size: usize,
}

impl CorpusBuilder {
    pub fn new(embedder: Arc<dyn Embedder>, splitter: TextSplitter, workers: usize) -> Self {
        Self {
            embedder,
            splitter,
            workers: workers.max(1),
            batch_size: EMBED_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Builds a complete snapshot. Documents that fail to download are
    /// logged and skipped; embedding failures abort the build.
    pub async fn build(&self, source: Arc<dyn DocumentSource>) -> Result<KnowledgeCorpus, IngestError> {
        let keys: Vec<String> = source
            .list()
            .await?
            .into_iter()
            .filter(|k| is_supported(k))
            .collect();
        info!(
            "Processing {} documents from {} with {} workers",
            keys.len(),
            source.describe(),
            self.workers
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        for key in keys {
            let source = source.clone();
            let semaphore = semaphore.clone();
            let splitter = self.splitter.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                match source.fetch(&key).await {
                    Ok(bytes) => Ok(splitter.split_document(&key, &decode_text(&bytes))),
                    Err(e) => Err((key, e)),
                }
            });
        }

        let mut chunks: Vec<Chunk> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(doc_chunks)) => chunks.extend(doc_chunks),
                Ok(Err((key, e))) => warn!("Skipping document {key}: {e}"),
                Err(e) => warn!("Document worker failed: {e}"),
            }
        }
        // Workers finish in any order; keep the snapshot deterministic.
        chunks.sort_by(|a, b| a.source.cmp(&b.source).then(a.index.cmp(&b.index)));
        info!("Total chunks created: {}", chunks.len());

        let mut indexed = Vec::with_capacity(chunks.len());
        for (batch_no, batch) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    got: vectors.len(),
                }
                .into());
            }
            info!("Embedded batch {} ({} chunks)", batch_no + 1, batch.len());
            indexed.extend(batch.iter().zip(vectors).map(|(chunk, embedding)| IndexedChunk {
                text: chunk.text.clone(),
                source: chunk.source.clone(),
                embedding,
            }));
        }

        let corpus = KnowledgeCorpus::new(indexed)?.with_model(self.embedder.model());
        for (source, count) in corpus.sources() {
            info!("  {source}: {count} chunks");
        }
        Ok(corpus)
    }

    pub fn model(&self) -> &str {
        self.embedder.model()
    }
}

/// Owns the rebuild lifecycle: at most one build at a time, the new snapshot
/// is installed only once complete, then persisted to the local index file.
pub struct Indexer {
    builder: CorpusBuilder,
    source: Arc<dyn DocumentSource>,
    store: Arc<dyn VectorStore>,
    snapshot_path: Option<PathBuf>,
    rebuild_lock: Mutex<()>,
}

impl Indexer {
    pub fn new(
        builder: CorpusBuilder,
        source: Arc<dyn DocumentSource>,
        store: Arc<dyn VectorStore>,
        snapshot_path: Option<PathBuf>,
    ) -> Self {
        Self {
            builder,
            source,
            store,
            snapshot_path,
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Installs the persisted snapshot if one loads cleanly, otherwise rebuilds.
    pub async fn load_or_build(&self) -> Result<Arc<KnowledgeCorpus>, IngestError> {
        if let Some(path) = self.snapshot_path.clone() {
            if path.is_file() {
                let loaded = tokio::task::spawn_blocking(move || KnowledgeCorpus::load(&path)).await?;
                match loaded {
                    Ok(corpus) if corpus.embedding_model.as_deref() == Some(self.builder.model()) => {
                        info!("Loaded knowledge corpus snapshot ({} chunks)", corpus.len());
                        return Ok(self.store.install(corpus).await);
                    }
                    Ok(corpus) => warn!(
                        "Corpus snapshot was embedded with {:?}, expected {}; rebuilding",
                        corpus.embedding_model,
                        self.builder.model()
                    ),
                    Err(e) => warn!("Failed to load corpus snapshot, rebuilding: {e}"),
                }
            }
        }
        self.rebuild().await
    }

    pub async fn rebuild(&self) -> Result<Arc<KnowledgeCorpus>, IngestError> {
        let _guard = self.rebuild_lock.lock().await;
        let started = Instant::now();

        let corpus = self.builder.build(self.source.clone()).await?;
        let installed = self.store.install(corpus).await;
        info!(
            "Knowledge corpus rebuilt in {:.2}s",
            started.elapsed().as_secs_f64()
        );

        if let Some(path) = self.snapshot_path.clone() {
            let snapshot = installed.clone();
            match tokio::task::spawn_blocking(move || snapshot.save(&path)).await? {
                Ok(()) => info!("Corpus snapshot saved"),
                Err(e) => warn!("Failed to persist corpus snapshot: {e}"),
            }
        }

        Ok(installed)
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }
}
