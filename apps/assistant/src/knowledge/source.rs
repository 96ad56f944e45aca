//! Document sources the corpus is built from: an S3 bucket or a local directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info};

/// Only plain-text formats are indexed.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["txt", "md", "csv", "json"];

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("S3 error: {0}")]
    S3(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    /// Keys of every supported document.
    async fn list(&self) -> Result<Vec<String>, SourceError>;

    async fn fetch(&self, key: &str) -> Result<Bytes, SourceError>;
}

pub fn is_supported(key: &str) -> bool {
    Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false)
}

/// UTF-8 first, Latin-1 otherwise. Latin-1 maps every byte, so decoding
/// never fails.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// S3
// ────────────────────────────────────────────────────────────────────────────

pub struct S3DocumentSource {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3DocumentSource {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl DocumentSource for S3DocumentSource {
    fn describe(&self) -> String {
        format!("s3://{}", self.bucket)
    }

    async fn list(&self) -> Result<Vec<String>, SourceError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| SourceError::S3(format!("{}", DisplayErrorContext(&e))))?;

            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|o| o.key())
                    .filter(|k| is_supported(k))
                    .map(String::from),
            );

            match output.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        info!("Found {} supported documents in s3://{}", keys.len(), self.bucket);
        Ok(keys)
    }

    async fn fetch(&self, key: &str) -> Result<Bytes, SourceError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| SourceError::S3(format!("{key}: {}", DisplayErrorContext(&e))))?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| SourceError::S3(format!("{key}: {e}")))?;
        debug!("Downloaded s3://{}/{}", self.bucket, key);
        Ok(body.into_bytes())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Local directory
// ────────────────────────────────────────────────────────────────────────────

pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentSource for DirectorySource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    async fn list(&self) -> Result<Vec<String>, SourceError> {
        let mut keys = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                if let Ok(relative) = path.strip_prefix(&self.root) {
                    let key = relative.to_string_lossy().replace('\\', "/");
                    if is_supported(&key) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn fetch(&self, key: &str) -> Result<Bytes, SourceError> {
        Ok(Bytes::from(tokio::fs::read(self.root.join(key)).await?))
    }
}
