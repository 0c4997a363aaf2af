use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::SchemaRepository;
use crate::domain::{DomainError, SchemaRecord};

/// Schema records held in process memory, keyed and ordered by name.
#[derive(Default)]
pub struct InMemorySchemaRepository {
    records: Mutex<BTreeMap<String, SchemaRecord>>,
}

impl InMemorySchemaRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchemaRepository for InMemorySchemaRepository {
    async fn save(&self, record: &SchemaRecord) -> Result<(), DomainError> {
        self.records
            .lock()
            .await
            .insert(record.name().to_string(), record.clone());
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<SchemaRecord>, DomainError> {
        Ok(self.records.lock().await.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<SchemaRecord>, DomainError> {
        Ok(self.records.lock().await.values().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, DomainError> {
        Ok(self.records.lock().await.remove(name).is_some())
    }
}
