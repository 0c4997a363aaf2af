use serde::{Deserialize, Serialize};

/// One self-contained unit of a schema definition, usually a single
/// `CREATE TABLE` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaFragment {
    id: String,
    schema_name: String,
    position: u32,
    kind: FragmentKind,
    object_name: Option<String>,
    content: String,
    document: String,
}

impl SchemaFragment {
    /// Builds a fragment whose embedded document is the raw content.
    ///
    /// Use [`SchemaFragment::with_document`] to attach the enriched text that
    /// embedding providers should see instead.
    pub fn new(
        schema_name: impl Into<String>,
        position: u32,
        kind: FragmentKind,
        object_name: Option<String>,
        content: impl Into<String>,
    ) -> Self {
        let schema_name = schema_name.into();
        let content = content.into();
        let id = fragment_id(&schema_name, object_name.as_deref(), position);
        Self {
            id,
            schema_name,
            position,
            kind,
            object_name,
            document: content.clone(),
            content,
        }
    }

    /// Reconstitutes from persisted data (used by adapters).
    pub fn reconstitute(
        id: String,
        schema_name: String,
        position: u32,
        kind: FragmentKind,
        object_name: Option<String>,
        content: String,
        document: String,
    ) -> Self {
        Self {
            id,
            schema_name,
            position,
            kind,
            object_name,
            content,
            document,
        }
    }

    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = document.into();
        self
    }

    /// Overrides the identifier, used to disambiguate duplicate object names.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn kind(&self) -> FragmentKind {
        self.kind
    }

    pub fn object_name(&self) -> Option<&str> {
        self.object_name.as_deref()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn document(&self) -> &str {
        &self.document
    }
}

fn fragment_id(schema_name: &str, object_name: Option<&str>, position: u32) -> String {
    match object_name {
        Some(name) => format!("{}:{}", schema_name, name),
        None => format!("{}:statement-{}", schema_name, position),
    }
}

/// What kind of DDL statement a fragment was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    Table,
    View,
    Index,
    Statement,
}

impl FragmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FragmentKind::Table => "table",
            FragmentKind::View => "view",
            FragmentKind::Index => "index",
            FragmentKind::Statement => "statement",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "table" => FragmentKind::Table,
            "view" => FragmentKind::View,
            "index" => FragmentKind::Index,
            _ => FragmentKind::Statement,
        }
    }
}

impl std::fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
