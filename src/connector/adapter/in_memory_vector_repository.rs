use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::vector_scoring::{ensure_k, rank, validate_replacement};
use crate::application::VectorRepository;
use crate::domain::{DistanceMetric, DomainError, Embedding, FragmentMatch, SchemaFragment};

/// One schema's entries, in insertion order.
struct SchemaIndex {
    dimensions: usize,
    entries: Vec<(SchemaFragment, Vec<f32>)>,
}

/// Vector index held in process memory.
///
/// Each schema's partition is an immutable snapshot. Replacement builds a new
/// snapshot and swaps the `Arc` under the write lock, so searches see either
/// the old partition or the new one.
pub struct InMemoryVectorRepository {
    partitions: RwLock<HashMap<String, Arc<SchemaIndex>>>,
    metric: DistanceMetric,
}

impl InMemoryVectorRepository {
    pub fn new() -> Self {
        Self::with_metric(DistanceMetric::default())
    }

    pub fn with_metric(metric: DistanceMetric) -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
            metric,
        }
    }
}

impl Default for InMemoryVectorRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorRepository for InMemoryVectorRepository {
    async fn replace(
        &self,
        schema_name: &str,
        fragments: &[SchemaFragment],
        embeddings: &[Embedding],
    ) -> Result<(), DomainError> {
        let dimensions = validate_replacement(schema_name, fragments, embeddings)?;

        let index = SchemaIndex {
            dimensions,
            entries: fragments
                .iter()
                .cloned()
                .zip(embeddings.iter().map(|e| e.vector().to_vec()))
                .collect(),
        };

        let mut partitions = self.partitions.write().await;
        if index.entries.is_empty() {
            partitions.remove(schema_name);
        } else {
            partitions.insert(schema_name.to_string(), Arc::new(index));
        }

        debug!(
            "Replaced in-memory index for '{}' with {} entries",
            schema_name,
            fragments.len()
        );
        Ok(())
    }

    async fn search(
        &self,
        schema_name: &str,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<FragmentMatch>, DomainError> {
        ensure_k(k)?;

        let index = self
            .partitions
            .read()
            .await
            .get(schema_name)
            .cloned()
            .ok_or_else(|| DomainError::schema_not_indexed(schema_name))?;

        if query_vector.len() != index.dimensions {
            return Err(DomainError::dimension_mismatch(
                index.dimensions,
                query_vector.len(),
            ));
        }

        Ok(rank(
            index.entries.iter().map(|(f, v)| (f, v.as_slice())),
            query_vector,
            k,
            self.metric,
        ))
    }

    async fn delete_by_schema(&self, schema_name: &str) -> Result<u64, DomainError> {
        let removed = self.partitions.write().await.remove(schema_name);
        Ok(removed.map(|index| index.entries.len() as u64).unwrap_or(0))
    }

    async fn count(&self, schema_name: &str) -> Result<u64, DomainError> {
        Ok(self
            .partitions
            .read()
            .await
            .get(schema_name)
            .map(|index| index.entries.len() as u64)
            .unwrap_or(0))
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}
