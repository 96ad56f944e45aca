//! Embedding client for an OpenAI-compatible `/v1/embeddings` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Expected {expected} embeddings, got {got}")]
    CountMismatch { expected: usize, got: usize },
}

/// Turns texts into vectors. One vector per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifies the embedding space; snapshots from another model are rebuilt.
    fn model(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    api_url: String,
    model: String,
    api_key: String,
}

impl OpenAiEmbedder {
    pub fn new(api_url: String, model: String, api_key: String) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()?,
            api_url,
            model,
            api_key,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: EmbeddingResponse = response.json().await?;
        debug!("Embedded {} texts with {}", body.data.len(), self.model);
        order_embeddings(body.data, texts.len())
    }
}

/// The API may return rows out of order; `index` is authoritative.
fn order_embeddings(
    mut data: Vec<EmbeddingData>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if data.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            got: data.len(),
        });
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_embeddings_sorts_by_index() {
        let body: EmbeddingResponse = serde_json::from_str(
            r#"{"data": [
                {"embedding": [0.0, 1.0], "index": 1},
                {"embedding": [1.0, 0.0], "index": 0}
            ]}"#,
        )
        .unwrap();
        let ordered = order_embeddings(body.data, 2).unwrap();
        assert_eq!(ordered, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_order_embeddings_rejects_missing_rows() {
        let data = vec![EmbeddingData {
            embedding: vec![1.0],
            index: 0,
        }];
        assert!(matches!(
            order_embeddings(data, 2),
            Err(EmbeddingError::CountMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_request_shape() {
        let input = vec!["leave policy".to_string()];
        let value = serde_json::to_value(EmbeddingRequest {
            model: "text-embedding-3-small",
            input: &input,
        })
        .unwrap();
        assert_eq!(value["model"], "text-embedding-3-small");
        assert_eq!(value["input"][0], "leave policy");
    }
}
