use async_trait::async_trait;

use crate::domain::{DomainError, SchemaRecord};

/// Persistence for schema definitions and their index freshness.
#[async_trait]
pub trait SchemaRepository: Send + Sync {
    /// Inserts or overwrites the record with the same name.
    async fn save(&self, record: &SchemaRecord) -> Result<(), DomainError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<SchemaRecord>, DomainError>;

    /// All records ordered by name.
    async fn list(&self) -> Result<Vec<SchemaRecord>, DomainError>;

    /// Returns whether a record was removed.
    async fn delete(&self, name: &str) -> Result<bool, DomainError>;
}
