use crate::embeddings::{validate_embeddings, EmbeddingProvider};
use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Embeddings served by an Ollama instance over `POST /api/embed`.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    id: String,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, dimension: usize, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("Failed to initialize HTTP client: {e}"))
            })?;
        let base_url = base_url.trim_end_matches('/').to_string();
        log::info!("Initializing Ollama embedder: url={base_url}, model={model}");
        Ok(Self {
            client,
            id: format!("ollama/{model}"),
            model: model.to_string(),
            base_url,
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let start = Instant::now();
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| VectorStoreError::EmbeddingError(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VectorStoreError::EmbeddingError(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let result: EmbeddingResponse = response.json().await.map_err(|e| {
            VectorStoreError::EmbeddingError(format!("Failed to parse response: {e}"))
        })?;

        log::debug!(
            "Embedded {} texts via {} in {} ms",
            texts.len(),
            self.id,
            start.elapsed().as_millis()
        );
        validate_embeddings(texts.len(), self.dimension, result.embeddings)
    }
}
