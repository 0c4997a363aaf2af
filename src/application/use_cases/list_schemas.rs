use std::sync::Arc;

use crate::application::{SchemaParser, SchemaRepository};
use crate::domain::{DomainError, SchemaFormat, SchemaInfo, SchemaRecord, StructuredSchema};

pub struct ListSchemasUseCase {
    schema_repo: Arc<dyn SchemaRepository>,
    parser: Arc<dyn SchemaParser>,
}

impl ListSchemasUseCase {
    pub fn new(schema_repo: Arc<dyn SchemaRepository>, parser: Arc<dyn SchemaParser>) -> Self {
        Self {
            schema_repo,
            parser,
        }
    }

    pub async fn execute(&self) -> Result<Vec<SchemaRecord>, DomainError> {
        self.schema_repo.list().await
    }

    pub async fn get(&self, name: &str) -> Result<Option<SchemaRecord>, DomainError> {
        self.schema_repo.find_by_name(name).await
    }

    /// False for unknown names.
    pub async fn is_fresh(&self, name: &str) -> Result<bool, DomainError> {
        Ok(self
            .schema_repo
            .find_by_name(name)
            .await?
            .map(|record| record.is_fresh())
            .unwrap_or(false))
    }

    pub async fn info(&self, name: &str) -> Result<SchemaInfo, DomainError> {
        let record = self.require(name).await?;
        let tables = self
            .parser
            .parse(record.name(), record.definition())
            .map(|parsed| parsed.object_names())
            .unwrap_or_default();

        let structured = match record.format() {
            SchemaFormat::Structured => StructuredSchema::detect(record.definition())?,
            SchemaFormat::Ddl => None,
        };

        Ok(SchemaInfo {
            name: record.name().to_string(),
            format: record.format(),
            fresh: record.is_fresh(),
            fragment_count: record.fragment_count(),
            embedding_model: record.embedding_model().map(String::from),
            dimensions: record.dimensions(),
            tables,
            sql_language: structured.as_ref().map(|s| s.sql_language.clone()),
            description: structured
                .map(|s| s.description)
                .filter(|d| !d.is_empty()),
        })
    }

    /// The stored definition as DDL; structured schemas are rendered.
    pub async fn definition_as_ddl(&self, name: &str) -> Result<String, DomainError> {
        let record = self.require(name).await?;
        match StructuredSchema::detect(record.definition())? {
            Some(structured) => Ok(structured.to_ddl()),
            None => Ok(record.definition().to_string()),
        }
    }

    /// The stored definition in the structured format; DDL is converted.
    pub async fn definition_as_structured(
        &self,
        name: &str,
    ) -> Result<StructuredSchema, DomainError> {
        let record = self.require(name).await?;
        self.parser.to_structured(record.name(), record.definition())
    }

    async fn require(&self, name: &str) -> Result<SchemaRecord, DomainError> {
        self.schema_repo
            .find_by_name(name)
            .await?
            .ok_or_else(|| DomainError::schema_not_found(name))
    }
}
