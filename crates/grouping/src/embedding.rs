use async_trait::async_trait;
use thiserror::Error;

/// The external vector-embedding collaborator.
///
/// The engine never fabricates a vector: when embedding fails, similarity
/// grouping is skipped for that message.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbedError>;
}

#[derive(Error, Debug)]
#[error("Embedding unavailable: {0}")]
pub struct EmbedError(pub String);

impl From<EmbedError> for crate::error::GroupingError {
    fn from(err: EmbedError) -> Self {
        crate::error::GroupingError::EmbeddingUnavailable(err.0)
    }
}
