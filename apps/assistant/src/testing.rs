//! In-process fakes for the external seams, shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::hr_client::{EmployeeRecord, HrError, HrLookup};
use crate::knowledge::embedder::{Embedder, EmbeddingError};
use crate::knowledge::source::{DocumentSource, SourceError};
use crate::llm_client::{LanguageModel, LlmError, Message, ToolSpec};

// ────────────────────────────────────────────────────────────────────────────
// Language model
// ────────────────────────────────────────────────────────────────────────────

/// Scripted model. `None` for a response kind makes that call fail with a
/// 500 from the "API".
#[derive(Default)]
pub struct FakeLlm {
    structured: Option<Value>,
    answer: Option<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, Vec<Message>)>>,
}

impl FakeLlm {
    pub fn classifying(structured: Value) -> Self {
        Self {
            structured: Some(structured),
            ..Self::default()
        }
    }

    pub fn with_answer(mut self, answer: &str) -> Self {
        self.answer = Some(answer.to_string());
        self
    }

    pub fn failing() -> Self {
        Self::default()
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// System prompt and messages of the most recent call.
    pub fn last_call(&self) -> Option<(String, Vec<Message>)> {
        self.calls.lock().unwrap().last().cloned()
    }

    async fn record(&self, system: &str, messages: &[Message]) {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), messages.to_vec()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn unavailable() -> LlmError {
        LlmError::Api {
            status: 500,
            message: "model unavailable".to_string(),
        }
    }
}

#[async_trait]
impl LanguageModel for FakeLlm {
    async fn complete(&self, system: &str, messages: &[Message]) -> Result<String, LlmError> {
        self.record(system, messages).await;
        self.answer.clone().ok_or_else(Self::unavailable)
    }

    async fn complete_structured(
        &self,
        system: &str,
        messages: &[Message],
        _tool: &ToolSpec,
    ) -> Result<Value, LlmError> {
        self.record(system, messages).await;
        self.structured.clone().ok_or_else(Self::unavailable)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Embeddings
// ────────────────────────────────────────────────────────────────────────────

const VOCABULARY: [&str; 9] = [
    "holiday", "payroll", "leave", "salary", "vacation", "policy", "benefits", "office", "remote",
];

pub const KEYWORD_MODEL: &str = "keyword-test";

/// Bag-of-keywords embedder: one dimension per vocabulary word plus a small
/// constant so no vector is all zeros.
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    pub fn vector(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut v: Vec<f32> = VOCABULARY
            .iter()
            .map(|w| lower.matches(w).count() as f32)
            .collect();
        v.push(0.1);
        v
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model(&self) -> &str {
        KEYWORD_MODEL
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HR service
// ────────────────────────────────────────────────────────────────────────────

pub struct FakeHr {
    record: Option<EmployeeRecord>,
    lookups: Mutex<Vec<String>>,
}

impl FakeHr {
    pub fn returning(vacancy_balance_days: i64, ytd_payroll: f64, name: Option<&str>) -> Self {
        Self {
            record: Some(EmployeeRecord {
                vacancy_balance_days,
                ytd_payroll,
                name: name.map(String::from),
            }),
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            record: None,
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl HrLookup for FakeHr {
    async fn employee_data(&self, employee_code: &str) -> Result<EmployeeRecord, HrError> {
        self.lookups.lock().unwrap().push(employee_code.to_string());
        self.record.clone().ok_or_else(|| HrError::Status {
            status: 404,
            message: "employee not found".to_string(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Documents
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemorySource {
    documents: HashMap<String, String>,
    failing: Vec<String>,
    fetch_delay: Option<Duration>,
    fetches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemorySource {
    pub fn with(mut self, key: &str, text: &str) -> Self {
        self.documents.insert(key.to_string(), text.to_string());
        self
    }

    /// Listed, but every fetch fails.
    pub fn failing(mut self, key: &str) -> Self {
        self.failing.push(key.to_string());
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Highest number of fetches that were running at the same time.
    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn list(&self) -> Result<Vec<String>, SourceError> {
        let mut keys: Vec<String> = self
            .documents
            .keys()
            .chain(self.failing.iter())
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn fetch(&self, key: &str) -> Result<Bytes, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.documents.get(key) {
            Some(text) if !self.failing.iter().any(|k| k == key) => {
                Ok(Bytes::from(text.clone()))
            }
            _ => Err(SourceError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{key} unavailable"),
            ))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Application state
// ────────────────────────────────────────────────────────────────────────────

pub fn test_config() -> crate::config::Config {
    crate::config::Config {
        anthropic_api_key: "test-anthropic-key".to_string(),
        embedding_api_key: "test-embedding-key".to_string(),
        embedding_api_url: "http://127.0.0.1:9/v1/embeddings".to_string(),
        embedding_model: "test-embedding".to_string(),
        hr_api_url: "http://127.0.0.1:9".to_string(),
        hr_timeout_secs: 1,
        docs_s3_bucket: None,
        docs_dir: std::path::PathBuf::from("docs"),
        s3_endpoint: None,
        aws_region: "us-east-1".to_string(),
        index_path: std::path::PathBuf::from("index/corpus.json"),
        history_limit: 10,
        session_idle_ttl_secs: 3600,
        max_sessions: 100,
        retrieval_k: 3,
        chunk_size: 300,
        chunk_overlap: 50,
        ingest_workers: 2,
        port: 0,
        rust_log: "debug".to_string(),
    }
}

/// Fully wired state over fakes. The corpus starts unloaded; call
/// `state.indexer.rebuild()` to build it from `documents`.
pub fn test_state(llm: FakeLlm, hr: FakeHr, documents: MemorySource) -> crate::state::AppState {
    use std::sync::Arc;

    use crate::chat::orchestrator::Orchestrator;
    use crate::chat::session::SessionStore;
    use crate::knowledge::chunker::TextSplitter;
    use crate::knowledge::ingest::{CorpusBuilder, Indexer};
    use crate::knowledge::store::{KnowledgeBase, Retriever};

    let config = test_config();
    let knowledge = Arc::new(KnowledgeBase::new(Arc::new(KeywordEmbedder)));
    let indexer = Indexer::new(
        CorpusBuilder::new(
            Arc::new(KeywordEmbedder),
            TextSplitter::new(config.chunk_size, config.chunk_overlap),
            config.ingest_workers,
        ),
        Arc::new(documents),
        knowledge.clone(),
        None,
    );
    let retriever = Retriever::new(knowledge.clone(), config.retrieval_k);
    let orchestrator = Orchestrator::new(Arc::new(llm), retriever.clone(), Arc::new(hr));

    crate::state::AppState {
        orchestrator: Arc::new(orchestrator),
        sessions: Arc::new(SessionStore::with_limits(
            config.history_limit,
            std::time::Duration::from_secs(config.session_idle_ttl_secs),
            config.max_sessions,
        )),
        knowledge,
        retriever,
        indexer: Arc::new(indexer),
        config,
    }
}
