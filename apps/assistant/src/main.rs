mod chat;
mod config;
mod errors;
mod hr_client;
mod knowledge;
mod llm_client;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use aws_config::Region;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::chat::orchestrator::Orchestrator;
use crate::chat::session::SessionStore;
use crate::config::Config;
use crate::hr_client::HrClient;
use crate::knowledge::chunker::TextSplitter;
use crate::knowledge::embedder::OpenAiEmbedder;
use crate::knowledge::ingest::{CorpusBuilder, Indexer};
use crate::knowledge::source::{DirectorySource, DocumentSource, S3DocumentSource};
use crate::knowledge::store::{KnowledgeBase, Retriever};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting HR assistant v{}", env!("CARGO_PKG_VERSION"));

    // External collaborators
    let llm = Arc::new(LlmClient::new(config.anthropic_api_key.clone())?);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let embedder = Arc::new(OpenAiEmbedder::new(
        config.embedding_api_url.clone(),
        config.embedding_model.clone(),
        config.embedding_api_key.clone(),
    )?);
    let hr = Arc::new(HrClient::new(&config.hr_api_url, config.hr_timeout_secs)?);
    info!("HR client initialized ({})", config.hr_api_url);

    // Knowledge base: explicitly owned, passed to the retriever and indexer
    let knowledge = Arc::new(KnowledgeBase::new(embedder.clone()));
    let source: Arc<dyn DocumentSource> = match &config.docs_s3_bucket {
        Some(bucket) => {
            let s3 = build_s3_client(&config).await;
            info!("S3 client initialized");
            Arc::new(S3DocumentSource::new(s3, bucket.clone()))
        }
        None => Arc::new(DirectorySource::new(config.docs_dir.clone())),
    };
    let builder = CorpusBuilder::new(
        embedder,
        TextSplitter::new(config.chunk_size, config.chunk_overlap),
        config.ingest_workers,
    );
    let indexer = Arc::new(Indexer::new(
        builder,
        source,
        knowledge.clone(),
        Some(config.index_path.clone()),
    ));

    // Serve even without a corpus; general questions fail until a reindex succeeds
    match indexer.load_or_build().await {
        Ok(corpus) => info!("Knowledge corpus ready ({} chunks)", corpus.len()),
        Err(e) => warn!(
            "Knowledge corpus unavailable from {}: {e}",
            indexer.source_description()
        ),
    }

    let retriever = Retriever::new(knowledge.clone(), config.retrieval_k);
    let orchestrator = Orchestrator::new(llm, retriever.clone(), hr);

    let idle_ttl = Duration::from_secs(config.session_idle_ttl_secs);
    let sessions = Arc::new(SessionStore::with_limits(
        config.history_limit,
        idle_ttl,
        config.max_sessions,
    ));
    // Opening a session also sweeps; this frees memory once traffic stops.
    {
        let sessions = sessions.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(idle_ttl.max(Duration::from_secs(60)));
            loop {
                ticker.tick().await;
                sessions.sweep_idle().await;
            }
        });
    }

    // Build app state
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        sessions,
        knowledge,
        retriever,
        indexer,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client from the default AWS credential chain, pointed at
/// `S3_ENDPOINT` (MinIO/local) when set.
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()));
    if let Some(endpoint) = &config.s3_endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let shared = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(config.s3_endpoint.is_some())
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
