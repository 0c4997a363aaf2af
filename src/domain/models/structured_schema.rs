use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DomainError;

/// JSON schema description with per-table and per-column documentation.
///
/// ```json
/// {
///   "database_name": "ShopDB",
///   "sql_language": "PostgreSQL",
///   "description": "Orders and customers",
///   "tables": [
///     {
///       "table_name": "orders",
///       "description": "One row per order",
///       "columns": [
///         { "column_name": "id", "type": "INT", "is_pk": true },
///         { "column_name": "total", "type": "FLOAT", "description": "Order total" }
///       ]
///     }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredSchema {
    pub database_name: String,
    #[serde(default = "default_sql_language")]
    pub sql_language: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tables: Vec<TableDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub table_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub column_name: String,
    #[serde(rename = "type", default = "default_column_type")]
    pub column_type: String,
    #[serde(default)]
    pub is_pk: bool,
    #[serde(default)]
    pub description: String,
}

fn default_sql_language() -> String {
    "SQL".to_string()
}

fn default_column_type() -> String {
    "VARCHAR".to_string()
}

impl StructuredSchema {
    /// Returns `Some` when `text` is a JSON object carrying a `database_name`.
    /// Anything else is treated as DDL by callers.
    pub fn detect(text: &str) -> Result<Option<Self>, DomainError> {
        let value: Value = match serde_json::from_str(text.trim()) {
            Ok(v) => v,
            Err(_) => return Ok(None),
        };

        if value.get("database_name").is_none() {
            return Ok(None);
        }

        let issues = Self::validate(&value);
        if !issues.is_empty() {
            return Err(DomainError::parse(format!(
                "invalid structured schema: {}",
                issues.join("; ")
            )));
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| DomainError::parse(format!("invalid structured schema: {}", e)))
    }

    /// Lists every problem with a structured schema document. Empty when valid.
    pub fn validate(value: &Value) -> Vec<String> {
        let mut issues = Vec::new();

        if value.get("database_name").and_then(Value::as_str).is_none() {
            issues.push("Missing required field: database_name".to_string());
        }

        let tables = match value.get("tables") {
            None => {
                issues.push("Missing required field: tables".to_string());
                return issues;
            }
            Some(Value::Array(tables)) => tables,
            Some(_) => {
                issues.push("Field 'tables' must be a list".to_string());
                return issues;
            }
        };

        for (i, table) in tables.iter().enumerate() {
            let Some(table) = table.as_object() else {
                issues.push(format!("Table {}: must be an object", i + 1));
                continue;
            };

            let table_name = table
                .get("table_name")
                .and_then(Value::as_str)
                .map(String::from);
            if table_name.is_none() {
                issues.push(format!("Table {}: missing required field 'table_name'", i + 1));
            }
            let label = table_name.unwrap_or_else(|| format!("Table_{}", i + 1));

            match table.get("columns") {
                None => issues.push(format!("Table '{}': missing required field 'columns'", label)),
                Some(Value::Array(columns)) => {
                    for (j, column) in columns.iter().enumerate() {
                        let Some(column) = column.as_object() else {
                            issues.push(format!("Table '{}', Column {}: must be an object", label, j + 1));
                            continue;
                        };
                        if !column.contains_key("column_name") {
                            issues.push(format!("Table '{}', Column {}: missing 'column_name'", label, j + 1));
                        }
                        if !column.contains_key("type") {
                            issues.push(format!("Table '{}', Column {}: missing 'type'", label, j + 1));
                        }
                    }
                }
                Some(_) => issues.push(format!("Table '{}': 'columns' must be a list", label)),
            }
        }

        issues
    }

    /// Renders the whole schema as commented DDL.
    pub fn to_ddl(&self) -> String {
        let mut parts = vec![
            format!("-- Database: {}", self.database_name),
            format!("-- Language: {}", self.sql_language),
        ];
        if !self.description.is_empty() {
            parts.push(format!("-- Description: {}", self.description));
        }
        parts.push(String::new());

        for table in &self.tables {
            if !table.description.is_empty() {
                parts.push(format!("-- Table: {} - {}", table.table_name, table.description));
            }
            parts.push(table.to_ddl());
            parts.push(String::new());
        }

        parts.join("\n")
    }
}

impl TableDefinition {
    pub fn to_ddl(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|col| {
                let mut line = format!("    {} {}", col.column_name, col.column_type);
                if col.is_pk {
                    line.push_str(" PRIMARY KEY");
                }
                line
            })
            .collect();

        format!("CREATE TABLE {} (\n{}\n);", self.table_name, columns.join(",\n"))
    }

    /// Column summary used in embedding documents, e.g.
    /// `id (INT) [PRIMARY KEY], total (FLOAT) - Order total`.
    pub fn columns_description(&self) -> String {
        self.columns
            .iter()
            .map(|col| {
                let mut text = format!("{} ({})", col.column_name, col.column_type);
                if !col.description.is_empty() {
                    text.push_str(&format!(" - {}", col.description));
                }
                if col.is_pk {
                    text.push_str(" [PRIMARY KEY]");
                }
                text
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
