use std::sync::Arc;

use tracing::info;

use crate::application::{SchemaRepository, VectorRepository};
use crate::domain::DomainError;

use super::SchemaLocks;

/// Removes a schema's index entries and its stored definition.
pub struct DeleteSchemaUseCase {
    schema_repo: Arc<dyn SchemaRepository>,
    vector_repo: Arc<dyn VectorRepository>,
    locks: Arc<SchemaLocks>,
}

impl DeleteSchemaUseCase {
    pub fn new(
        schema_repo: Arc<dyn SchemaRepository>,
        vector_repo: Arc<dyn VectorRepository>,
        locks: Arc<SchemaLocks>,
    ) -> Self {
        Self {
            schema_repo,
            vector_repo,
            locks,
        }
    }

    /// Returns the number of index entries removed.
    pub async fn execute(&self, name: &str) -> Result<u64, DomainError> {
        let _guard = self.locks.acquire(name).await;

        let record = self
            .schema_repo
            .find_by_name(name)
            .await?
            .ok_or_else(|| DomainError::schema_not_found(name))?;

        info!("Deleting schema: {}", record.summary());

        let removed = self.vector_repo.delete_by_schema(name).await?;
        self.schema_repo.delete(name).await?;

        info!("Schema deleted ({} index entries removed)", removed);

        Ok(removed)
    }
}
