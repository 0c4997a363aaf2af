use serde::{Deserialize, Serialize};

/// How a schema definition was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchemaFormat {
    #[default]
    Ddl,
    Structured,
}

impl SchemaFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaFormat::Ddl => "ddl",
            SchemaFormat::Structured => "structured",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "structured" => SchemaFormat::Structured,
            _ => SchemaFormat::Ddl,
        }
    }
}

impl std::fmt::Display for SchemaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks a schema's raw definition and whether its vector index matches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRecord {
    name: String,
    format: SchemaFormat,
    definition: String,
    definition_hash: String,
    fresh: bool,
    fragment_count: u64,
    embedding_model: Option<String>,
    dimensions: Option<usize>,
    created_at: i64,
    updated_at: i64,
}

impl SchemaRecord {
    /// A newly seen schema. It has no index yet, so it starts stale.
    pub fn new(name: String, format: SchemaFormat, definition: String) -> Self {
        let now = current_timestamp();
        Self {
            name,
            format,
            definition_hash: compute_definition_hash(&definition),
            definition,
            fresh: false,
            fragment_count: 0,
            embedding_model: None,
            dimensions: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitutes from persisted data (used by adapters).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        name: String,
        format: SchemaFormat,
        definition: String,
        definition_hash: String,
        fresh: bool,
        fragment_count: u64,
        embedding_model: Option<String>,
        dimensions: Option<usize>,
        created_at: i64,
        updated_at: i64,
    ) -> Self {
        Self {
            name,
            format,
            definition,
            definition_hash,
            fresh,
            fragment_count,
            embedding_model,
            dimensions,
            created_at,
            updated_at,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> SchemaFormat {
        self.format
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn definition_hash(&self) -> &str {
        &self.definition_hash
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn fragment_count(&self) -> u64 {
        self.fragment_count
    }

    pub fn embedding_model(&self) -> Option<&str> {
        self.embedding_model.as_deref()
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    /// Fresh and built by the given embedding model.
    pub fn is_fresh_for(&self, model: &str) -> bool {
        self.fresh && self.embedding_model.as_deref() == Some(model)
    }

    pub fn has_definition(&self, definition: &str) -> bool {
        self.definition_hash == compute_definition_hash(definition)
    }

    /// Replaces the raw definition. The index no longer matches it, so the
    /// record becomes stale until [`SchemaRecord::mark_indexed`] is called.
    pub fn update_definition(&mut self, format: SchemaFormat, definition: String) {
        if !self.has_definition(&definition) {
            self.fresh = false;
        }
        self.definition_hash = compute_definition_hash(&definition);
        self.definition = definition;
        self.format = format;
        self.updated_at = current_timestamp();
    }

    pub fn mark_indexed(&mut self, fragment_count: u64, embedding_model: &str, dimensions: usize) {
        self.fresh = true;
        self.fragment_count = fragment_count;
        self.embedding_model = Some(embedding_model.to_string());
        self.dimensions = Some(dimensions);
        self.updated_at = current_timestamp();
    }

    pub fn summary(&self) -> String {
        format!(
            "{} ({}, {} fragments, {})",
            self.name,
            self.format,
            self.fragment_count,
            if self.fresh { "fresh" } else { "stale" }
        )
    }
}

/// Summary of a stored schema for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub name: String,
    pub format: SchemaFormat,
    pub fresh: bool,
    pub fragment_count: u64,
    pub embedding_model: Option<String>,
    pub dimensions: Option<usize>,
    pub tables: Vec<String>,
    pub sql_language: Option<String>,
    pub description: Option<String>,
}

fn current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Computes SHA-256 hash of a schema definition.
pub fn compute_definition_hash(definition: &str) -> String {
    use sha2::{Digest, Sha256};
    let hash = Sha256::digest(definition.as_bytes());
    format!("{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_stale() {
        let record = SchemaRecord::new(
            "shop".to_string(),
            SchemaFormat::Ddl,
            "CREATE TABLE a (id INT);".to_string(),
        );

        assert!(!record.is_fresh());
        assert_eq!(record.fragment_count(), 0);
        assert_eq!(record.embedding_model(), None);
    }

    #[test]
    fn changing_definition_marks_stale() {
        let mut record = SchemaRecord::new(
            "shop".to_string(),
            SchemaFormat::Ddl,
            "CREATE TABLE a (id INT);".to_string(),
        );
        record.mark_indexed(1, "mock", 8);
        assert!(record.is_fresh_for("mock"));

        record.update_definition(SchemaFormat::Ddl, "CREATE TABLE b (id INT);".to_string());

        assert!(!record.is_fresh());
        assert!(record.has_definition("CREATE TABLE b (id INT);"));
    }

    #[test]
    fn same_definition_keeps_freshness() {
        let ddl = "CREATE TABLE a (id INT);".to_string();
        let mut record = SchemaRecord::new("shop".to_string(), SchemaFormat::Ddl, ddl.clone());
        record.mark_indexed(1, "mock", 8);

        record.update_definition(SchemaFormat::Ddl, ddl);

        assert!(record.is_fresh());
    }

    #[test]
    fn other_model_is_not_fresh() {
        let mut record = SchemaRecord::new(
            "shop".to_string(),
            SchemaFormat::Ddl,
            "CREATE TABLE a (id INT);".to_string(),
        );
        record.mark_indexed(1, "mock", 8);

        assert!(!record.is_fresh_for("all-MiniLM-L6-v2"));
    }

    #[test]
    fn test_compute_definition_hash() {
        let hash = compute_definition_hash("CREATE TABLE a (id INT);");

        assert_eq!(hash.len(), 64);
        assert_eq!(hash, compute_definition_hash("CREATE TABLE a (id INT);"));
        assert_ne!(hash, compute_definition_hash("CREATE TABLE b (id INT);"));
    }
}
