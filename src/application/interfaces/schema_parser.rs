use crate::domain::{DomainError, SchemaFormat, SchemaFragment, StructuredSchema};

/// Splits a schema definition into fragments.
pub trait SchemaParser: Send + Sync {
    /// Fails with [`DomainError::ParseError`] when the definition yields no
    /// fragments.
    fn parse(
        &self,
        schema_name: &str,
        definition: &str,
    ) -> Result<ParsedSchema, DomainError>;

    /// The definition in the structured JSON format. Structured input is
    /// returned as is; DDL is converted table by table and named
    /// `database_name` unless it says otherwise.
    fn to_structured(
        &self,
        database_name: &str,
        definition: &str,
    ) -> Result<StructuredSchema, DomainError>;

    /// Schema name implied by the definition itself, used when the caller
    /// does not supply one.
    fn derive_name(&self, definition: &str) -> String;
}

/// Result of splitting a definition.
#[derive(Debug, Clone)]
pub struct ParsedSchema {
    pub format: SchemaFormat,
    pub fragments: Vec<SchemaFragment>,
}

impl ParsedSchema {
    pub fn fragment_ids(&self) -> Vec<String> {
        self.fragments.iter().map(|f| f.id().to_string()).collect()
    }

    /// Names of the tables and views, in definition order.
    pub fn object_names(&self) -> Vec<String> {
        self.fragments
            .iter()
            .filter_map(|f| f.object_name().map(String::from))
            .collect()
    }
}
