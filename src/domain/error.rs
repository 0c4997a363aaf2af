use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    #[error("Schema not indexed: {0}")]
    SchemaNotIndexed(String),

    #[error("Stale index for schema '{0}': definition or embedding model changed since the last ingestion")]
    StaleIndex(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Dimension mismatch: index holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    pub fn schema_not_found(name: impl Into<String>) -> Self {
        Self::SchemaNotFound(name.into())
    }

    pub fn schema_not_indexed(name: impl Into<String>) -> Self {
        Self::SchemaNotIndexed(name.into())
    }

    pub fn stale_index(name: impl Into<String>) -> Self {
        Self::StaleIndex(name.into())
    }

    pub fn provider_unavailable(msg: impl Into<String>) -> Self {
        Self::ProviderUnavailable(msg.into())
    }

    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn is_schema_not_found(&self) -> bool {
        matches!(self, Self::SchemaNotFound(_))
    }

    pub fn is_provider_unavailable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::StorageError(_))
    }
}
