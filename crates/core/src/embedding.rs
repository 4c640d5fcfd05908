use async_trait::async_trait;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(String),
    #[error("embedding provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("embedding response was malformed: {0}")]
    Decode(String),
    #[error("embedding has {actual} dimensions, expected {expected}")]
    Dimensions { expected: usize, actual: usize },
}

/// Turns text into a fixed-length vector for similarity search.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}
