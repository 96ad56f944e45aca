use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::chat::history::DEFAULT_HISTORY_LIMIT;
use crate::chat::session::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_IDLE_TTL};
use crate::knowledge::store::DEFAULT_TOP_K;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or a number is malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub embedding_api_key: String,
    pub embedding_api_url: String,
    pub embedding_model: String,
    pub hr_api_url: String,
    pub hr_timeout_secs: u64,
    /// Documents come from this bucket when set, `docs_dir` otherwise.
    pub docs_s3_bucket: Option<String>,
    pub docs_dir: PathBuf,
    pub s3_endpoint: Option<String>,
    pub aws_region: String,
    pub index_path: PathBuf,
    pub history_limit: usize,
    pub session_idle_ttl_secs: u64,
    pub max_sessions: usize,
    pub retrieval_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub ingest_workers: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            embedding_api_key: require_env("EMBEDDING_API_KEY")?,
            embedding_api_url: env_or(
                "EMBEDDING_API_URL",
                "https://api.openai.com/v1/embeddings",
            ),
            embedding_model: env_or("EMBEDDING_MODEL", "text-embedding-3-small"),
            hr_api_url: env_or("HR_API_URL", "http://127.0.0.1:8000"),
            hr_timeout_secs: parse_env("HR_TIMEOUT_SECS", 10)?,
            docs_s3_bucket: optional_env("DOCS_S3_BUCKET"),
            docs_dir: PathBuf::from(env_or("DOCS_DIR", "docs")),
            s3_endpoint: optional_env("S3_ENDPOINT"),
            aws_region: env_or("AWS_REGION", "us-east-1"),
            index_path: PathBuf::from(env_or("INDEX_PATH", "index/corpus.json")),
            history_limit: parse_env("HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?,
            session_idle_ttl_secs: parse_env(
                "SESSION_IDLE_TTL_SECS",
                DEFAULT_SESSION_IDLE_TTL.as_secs(),
            )?,
            max_sessions: parse_env("MAX_SESSIONS", DEFAULT_MAX_SESSIONS)?,
            retrieval_k: parse_env("RETRIEVAL_K", DEFAULT_TOP_K)?,
            chunk_size: parse_env("CHUNK_SIZE", 300)?,
            chunk_overlap: parse_env("CHUNK_OVERLAP", 50)?,
            ingest_workers: parse_env("INGEST_WORKERS", 4)?,
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_accepts_numbers() {
        assert_eq!(parse_value::<usize>("CHUNK_SIZE", " 300 ").unwrap(), 300);
        assert_eq!(parse_value::<u16>("PORT", "8080").unwrap(), 8080);
    }

    #[test]
    fn test_parse_value_reports_key() {
        let err = parse_value::<usize>("RETRIEVAL_K", "three").unwrap_err();
        assert!(err.to_string().contains("RETRIEVAL_K"));
    }

    #[test]
    fn test_parse_value_rejects_out_of_range_port() {
        assert!(parse_value::<u16>("PORT", "70000").is_err());
    }
}
