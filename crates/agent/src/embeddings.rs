use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use hrbot_core::config::EmbeddingsConfig;
use hrbot_core::{Embedder, EmbeddingError};

/// OpenAI `/embeddings` client used for both query and seed embeddings.
pub struct OpenAiEmbedder {
    http: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingsConfig) -> Result<Self, EmbeddingError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

fn first_embedding(
    response: EmbeddingResponse,
    expected: usize,
) -> Result<Vec<f32>, EmbeddingError> {
    let embedding = response
        .data
        .into_iter()
        .next()
        .map(|datum| datum.embedding)
        .ok_or_else(|| EmbeddingError::Decode("response carried no embeddings".to_string()))?;

    if embedding.len() != expected {
        return Err(EmbeddingError::Dimensions { expected, actual: embedding.len() });
    }
    Ok(embedding)
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&json!({ "model": self.model, "input": text }))
            .send()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status { status: status.as_u16(), body });
        }

        let decoded: EmbeddingResponse =
            response.json().await.map_err(|e| EmbeddingError::Decode(e.to_string()))?;
        first_embedding(decoded, self.dimensions)
    }
}
