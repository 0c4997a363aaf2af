use async_trait::async_trait;

use crate::domain::{DistanceMetric, DomainError, Embedding, FragmentMatch, SchemaFragment};

/// Vector storage and similarity search, partitioned by schema name.
#[async_trait]
pub trait VectorRepository: Send + Sync {
    /// Replaces every entry stored for `schema_name`.
    ///
    /// The replacement is built completely before it becomes visible; on
    /// error the previous entries stay in place.
    async fn replace(
        &self,
        schema_name: &str,
        fragments: &[SchemaFragment],
        embeddings: &[Embedding],
    ) -> Result<(), DomainError>;

    /// Returns up to `k` entries best-first; ties keep insertion order.
    async fn search(
        &self,
        schema_name: &str,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<FragmentMatch>, DomainError>;

    /// Returns the number of entries removed.
    async fn delete_by_schema(&self, schema_name: &str) -> Result<u64, DomainError>;

    async fn count(&self, schema_name: &str) -> Result<u64, DomainError>;

    async fn is_indexed(&self, schema_name: &str) -> Result<bool, DomainError> {
        Ok(self.count(schema_name).await? > 0)
    }

    fn metric(&self) -> DistanceMetric;
}
