use async_trait::async_trait;

use crate::domain::{DomainError, Embedding, EmbeddingConfig, SchemaFragment};

/// Generates vector embeddings from schema fragments and questions.
///
/// Implementations must be deterministic for a given model and input, fail
/// with [`DomainError::InvalidInput`] on empty text and with
/// [`DomainError::ProviderUnavailable`] when the backing model or service
/// cannot be reached.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// One embedding per fragment, in input order.
    async fn embed_fragments(
        &self,
        fragments: &[SchemaFragment],
    ) -> Result<Vec<Embedding>, DomainError>;

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, DomainError>;

    fn config(&self) -> &EmbeddingConfig;
}
