use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::application::{ParsedSchema, SchemaParser};
use crate::domain::{
    ColumnDefinition, DomainError, FragmentKind, SchemaFormat, SchemaFragment, StructuredSchema,
    TableDefinition,
};

const FALLBACK_SCHEMA_NAME: &str = "Custom_Schema";

/// Column-list entries that declare constraints rather than columns.
const CONSTRAINT_KEYWORDS: &[&str] = &[
    "CONSTRAINT", "PRIMARY", "FOREIGN", "UNIQUE", "CHECK", "KEY", "INDEX", "EXCLUDE", "FULLTEXT",
    "SPATIAL",
];

const IDENT: &str = r#"(?:"[^"]+"|`[^`]+`|\[[^\]]+\]|[\w$]+)(?:\s*\.\s*(?:"[^"]+"|`[^`]+`|\[[^\]]+\]|[\w$]+))*"#;

fn table_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(
            r"(?is)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:(?:GLOBAL|LOCAL)\s+)?(?:(?:TEMP|TEMPORARY|UNLOGGED)\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?({})",
            IDENT
        ))
        .expect("Invalid CREATE TABLE pattern")
    })
}

fn view_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(
            r"(?is)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:(?:TEMP|TEMPORARY)\s+)?(?:MATERIALIZED\s+)?VIEW\s+(?:IF\s+NOT\s+EXISTS\s+)?({})",
            IDENT
        ))
        .expect("Invalid CREATE VIEW pattern")
    })
}

fn index_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(
            r"(?is)^\s*CREATE\s+(?:UNIQUE\s+)?INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+NOT\s+EXISTS\s+)?({})",
            IDENT
        ))
        .expect("Invalid CREATE INDEX pattern")
    })
}

fn column_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?s)^\s*("[^"]+"|`[^`]+`|\[[^\]]+\]|[\w$]+)\s+([A-Za-z_][\w]*(?:\s*\([^)]*\))?)"#)
            .expect("Invalid column pattern")
    })
}

fn primary_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)^\s*(?:CONSTRAINT\s+\S+\s+)?PRIMARY\s+KEY\s*\(([^)]*)\)")
            .expect("Invalid PRIMARY KEY pattern")
    })
}

/// `-- Database: ShopDB` style header comments written by
/// [`StructuredSchema::to_ddl`].
fn header_comment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?im)^[ \t]*--[ \t]*(Database|Language|Description):[ \t]*(.*?)[ \t\r]*$")
            .expect("Invalid header comment pattern")
    })
}

fn table_comment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?im)^[ \t]*--[ \t]*Table:[ \t]*(\S+)[ \t]+-[ \t]+(.*?)[ \t\r]*$")
            .expect("Invalid table comment pattern")
    })
}

/// Splits SQL DDL, or the structured JSON schema format, into one fragment
/// per statement or table.
#[derive(Debug, Default, Clone)]
pub struct DdlSchemaParser;

impl DdlSchemaParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_ddl(&self, schema_name: &str, definition: &str) -> Vec<SchemaFragment> {
        let mut fragments = Vec::new();

        for statement in split_statements(definition) {
            let code = strip_comments(&statement);
            if code.trim().is_empty() {
                continue;
            }

            let (kind, object_name) = classify(&code);
            let content = format!("{};", statement.trim());
            let position = fragments.len() as u32;

            let document = match (kind, object_name.as_deref()) {
                (FragmentKind::Table, Some(name)) => {
                    let columns = extract_columns(&code)
                        .iter()
                        .map(|(column, column_type)| format!("{} ({})", column, column_type))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!(
                        "Database schema: '{}'. Table: `{}`. Columns: {}. DDL: {}",
                        schema_name, name, columns, content
                    )
                }
                (FragmentKind::View, Some(name)) => format!(
                    "Database schema: '{}'. View: `{}`. DDL: {}",
                    schema_name, name, content
                ),
                (FragmentKind::Index, Some(name)) => format!(
                    "Database schema: '{}'. Index: `{}`. DDL: {}",
                    schema_name, name, content
                ),
                _ => format!("Database schema: '{}'. DDL: {}", schema_name, content),
            };

            fragments.push(
                SchemaFragment::new(schema_name, position, kind, object_name, content)
                    .with_document(document),
            );
        }

        fragments
    }

    fn parse_structured(&self, schema_name: &str, schema: &StructuredSchema) -> Vec<SchemaFragment> {
        schema
            .tables
            .iter()
            .enumerate()
            .map(|(position, table)| {
                SchemaFragment::new(
                    schema_name,
                    position as u32,
                    FragmentKind::Table,
                    Some(table.table_name.clone()),
                    table.to_ddl(),
                )
                .with_document(structured_document(schema_name, schema, table))
            })
            .collect()
    }

    /// Builds the structured form of a DDL definition from its `CREATE TABLE`
    /// statements. Header comments override `database_name` and fill in the
    /// language and description. Column descriptions are left empty.
    pub fn ddl_to_structured(
        &self,
        database_name: &str,
        definition: &str,
    ) -> Result<StructuredSchema, DomainError> {
        let mut schema = StructuredSchema {
            database_name: database_name.to_string(),
            sql_language: "SQL".to_string(),
            description: String::new(),
            tables: Vec::new(),
        };

        for captures in header_comment_pattern().captures_iter(definition) {
            let value = captures[2].to_string();
            if value.is_empty() {
                continue;
            }
            match captures[1].to_ascii_lowercase().as_str() {
                "database" => schema.database_name = value,
                "language" => schema.sql_language = value,
                _ => schema.description = value,
            }
        }

        for statement in split_statements(definition) {
            let code = strip_comments(&statement);
            if let (FragmentKind::Table, Some(name)) = classify(&code) {
                let table = table_definition(&statement, &code, name);
                schema.tables.push(table);
            }
        }

        if schema.tables.is_empty() {
            return Err(DomainError::parse(format!(
                "no CREATE TABLE statements to convert in '{}'",
                database_name
            )));
        }
        debug!(
            "Converted DDL of '{}' into {} structured tables",
            schema.database_name,
            schema.tables.len()
        );

        Ok(schema)
    }
}

impl SchemaParser for DdlSchemaParser {
    fn parse(&self, schema_name: &str, definition: &str) -> Result<ParsedSchema, DomainError> {
        if definition.trim().is_empty() {
            return Err(DomainError::parse("schema definition is empty"));
        }

        let (format, fragments) = match StructuredSchema::detect(definition)? {
            Some(structured) => (
                SchemaFormat::Structured,
                self.parse_structured(schema_name, &structured),
            ),
            None => (SchemaFormat::Ddl, self.parse_ddl(schema_name, definition)),
        };

        if fragments.is_empty() {
            return Err(DomainError::parse(format!(
                "no statements or tables found in the definition of '{}'",
                schema_name
            )));
        }
        if format == SchemaFormat::Ddl
            && !fragments.iter().any(|f| f.kind() == FragmentKind::Table)
        {
            warn!(
                "No CREATE TABLE statements in '{}'; indexing {} raw statements",
                schema_name,
                fragments.len()
            );
        }

        let fragments = disambiguate_ids(fragments);
        debug!(
            "Parsed '{}' as {} into {} fragments",
            schema_name,
            format,
            fragments.len()
        );

        Ok(ParsedSchema { format, fragments })
    }

    fn to_structured(
        &self,
        database_name: &str,
        definition: &str,
    ) -> Result<StructuredSchema, DomainError> {
        if definition.trim().is_empty() {
            return Err(DomainError::parse("schema definition is empty"));
        }
        match StructuredSchema::detect(definition)? {
            Some(structured) => Ok(structured),
            None => self.ddl_to_structured(database_name, definition),
        }
    }

    fn derive_name(&self, definition: &str) -> String {
        if let Ok(Some(structured)) = StructuredSchema::detect(definition) {
            return structured.database_name;
        }

        split_statements(definition)
            .iter()
            .map(|statement| strip_comments(statement))
            .find_map(|code| {
                table_pattern()
                    .captures(&code)
                    .and_then(|c| c.get(1))
                    .map(|m| format!("Schema_{}", unquote_identifier(m.as_str())))
            })
            .unwrap_or_else(|| FALLBACK_SCHEMA_NAME.to_string())
    }
}

fn structured_document(schema_name: &str, schema: &StructuredSchema, table: &TableDefinition) -> String {
    let mut parts = vec![
        format!("Database schema: '{}'", schema_name),
        format!("Table: `{}`", table.table_name),
    ];
    if !table.description.is_empty() {
        parts.push(format!("Table description: {}", table.description));
    }
    if !schema.description.is_empty() {
        parts.push(format!("Database description: {}", schema.description));
    }
    parts.push(format!("SQL Language: {}", schema.sql_language));
    parts.push(format!("Columns: {}", table.columns_description()));
    parts.push(format!("DDL: {}", table.to_ddl()));
    parts.join(". ")
}

/// Gives repeated ids a `#n` suffix, counting from 2, in definition order.
fn disambiguate_ids(fragments: Vec<SchemaFragment>) -> Vec<SchemaFragment> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    fragments
        .into_iter()
        .map(|fragment| {
            let count = seen.entry(fragment.id().to_string()).or_insert(0);
            *count += 1;
            if *count > 1 {
                let id = format!("{}#{}", fragment.id(), count);
                fragment.with_id(id)
            } else {
                fragment
            }
        })
        .collect()
}

fn classify(code: &str) -> (FragmentKind, Option<String>) {
    let patterns = [
        (FragmentKind::Table, table_pattern()),
        (FragmentKind::View, view_pattern()),
        (FragmentKind::Index, index_pattern()),
    ];

    for (kind, pattern) in patterns {
        if let Some(name) = pattern.captures(code).and_then(|c| c.get(1)) {
            let name = unquote_identifier(name.as_str());
            // `CREATE INDEX ON t (...)` has no name.
            if kind == FragmentKind::Index && name.eq_ignore_ascii_case("on") {
                return (kind, None);
            }
            return (kind, Some(name));
        }
    }

    (FragmentKind::Statement, None)
}

/// `"public"."Orders"` becomes `public.Orders`.
fn unquote_identifier(identifier: &str) -> String {
    identifier
        .split('.')
        .map(|part| {
            part.trim()
                .trim_matches(|c| matches!(c, '"' | '`' | '[' | ']'))
                .to_string()
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Top-level entries of the parenthesized list that follows the table name.
fn column_items(code: &str) -> Vec<String> {
    let Some(name) = table_pattern().captures(code).and_then(|c| c.get(1)) else {
        return Vec::new();
    };
    let rest = code[name.end()..].trim_start();
    let Some(body) = rest.strip_prefix('(') else {
        return Vec::new();
    };

    let mut depth = 1usize;
    let mut in_quote = false;
    let mut items = Vec::new();
    let mut current = String::new();

    for c in body.chars() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            ',' if !in_quote && depth == 1 => {
                items.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    items.push(current);
    items
}

/// Name and type of a column entry; `None` for constraint entries.
fn column_entry(item: &str) -> Option<(String, String)> {
    let first_word = item.split_whitespace().next()?.to_uppercase();
    if CONSTRAINT_KEYWORDS.contains(&first_word.as_str()) {
        return None;
    }
    let captures = column_pattern().captures(item)?;
    Some((
        unquote_identifier(&captures[1]),
        captures[2].split_whitespace().collect::<Vec<_>>().join(" "),
    ))
}

/// Column names and types. Constraint entries are skipped.
fn extract_columns(code: &str) -> Vec<(String, String)> {
    column_items(code)
        .iter()
        .filter_map(|item| column_entry(item))
        .collect()
}

/// `statement` is the raw text, comments included; `code` is the same text
/// with comments stripped.
fn table_definition(statement: &str, code: &str, table_name: String) -> TableDefinition {
    let items = column_items(code);

    let table_keys: Vec<String> = items
        .iter()
        .filter_map(|item| primary_key_pattern().captures(item))
        .flat_map(|captures| {
            captures[1]
                .split(',')
                .map(unquote_identifier)
                .collect::<Vec<_>>()
        })
        .collect();

    let columns = items
        .iter()
        .filter_map(|item| {
            let (column_name, column_type) = column_entry(item)?;
            let inline_key = item
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_uppercase()
                .contains("PRIMARY KEY");
            let is_pk = inline_key || table_keys.contains(&column_name);
            Some(ColumnDefinition {
                column_name,
                column_type,
                is_pk,
                description: String::new(),
            })
        })
        .collect();

    let description = table_comment_pattern()
        .captures_iter(statement)
        .find(|captures| unquote_identifier(&captures[1]) == table_name)
        .map(|captures| captures[2].to_string())
        .unwrap_or_default();

    TableDefinition {
        table_name,
        description,
        columns,
    }
}

/// Splits on top-level semicolons. Semicolons inside quotes, comments,
/// parentheses or dollar-quoted bodies do not end a statement.
pub fn split_statements(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                i = skip_quoted(bytes, i);
                continue;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = skip_line_comment(bytes, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_block_comment(bytes, i);
                continue;
            }
            b'$' => {
                if let Some(end) = skip_dollar_quoted(text, i) {
                    i = end;
                    continue;
                }
            }
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b';' if depth == 0 => {
                statements.push(text[start..i].to_string());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    if start < bytes.len() {
        statements.push(text[start..].to_string());
    }

    statements
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect()
}

/// Removes `--` and `/* */` comments, leaving quoted text untouched.
fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut output = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                i = skip_quoted(bytes, i);
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                output.push_str(&text[copied..i]);
                i = skip_line_comment(bytes, i);
                copied = i;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                output.push_str(&text[copied..i]);
                output.push(' ');
                i = skip_block_comment(bytes, i);
                copied = i;
            }
            _ => i += 1,
        }
    }
    output.push_str(&text[copied..]);
    output
}

/// Index just past the closing quote. Doubled quotes are escapes.
fn skip_quoted(bytes: &[u8], open: usize) -> usize {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Index of the newline ending the comment, which is kept.
fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|offset| start + offset)
        .unwrap_or(bytes.len())
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    bytes.len()
}

/// PostgreSQL `$tag$ ... $tag$` bodies. `None` when `start` does not open one.
fn skip_dollar_quoted(text: &str, start: usize) -> Option<usize> {
    let rest = &text[start + 1..];
    let tag_len = rest.find('$')?;
    let tag = &rest[..tag_len];
    if !tag.chars().all(|c| c.is_alphanumeric() || c == '_') || tag.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let delimiter = format!("${}$", tag);
    let body_start = start + delimiter.len();
    let close = text[body_start..].find(&delimiter)?;
    Some(body_start + close + delimiter.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOP_DDL: &str = "CREATE TABLE orders (id INT, total FLOAT);\n\
                            CREATE TABLE customers (id INT, name TEXT);";

    #[test]
    fn splits_one_fragment_per_table() {
        let parsed = DdlSchemaParser::new().parse("shop", SHOP_DDL).unwrap();

        assert_eq!(parsed.format, SchemaFormat::Ddl);
        assert_eq!(parsed.fragment_ids(), vec!["shop:orders", "shop:customers"]);
        assert_eq!(parsed.object_names(), vec!["orders", "customers"]);
        assert_eq!(
            parsed.fragments[0].content(),
            "CREATE TABLE orders (id INT, total FLOAT);"
        );
    }

    #[test]
    fn document_carries_schema_table_and_columns() {
        let parsed = DdlSchemaParser::new().parse("shop", SHOP_DDL).unwrap();

        assert_eq!(
            parsed.fragments[0].document(),
            "Database schema: 'shop'. Table: `orders`. Columns: id (INT), total (FLOAT). \
             DDL: CREATE TABLE orders (id INT, total FLOAT);"
        );
    }

    #[test]
    fn semicolons_in_quotes_and_comments_do_not_split() {
        let ddl = "-- orders; the main table\n\
                   CREATE TABLE orders (status TEXT DEFAULT 'a;b', /* x; y */ total FLOAT);\n\
                   CREATE TABLE \"odd;name\" (id INT);";

        let statements = split_statements(ddl);

        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("'a;b'"));
        assert!(statements[1].contains("\"odd;name\""));
    }

    #[test]
    fn nested_parentheses_stay_in_one_statement() {
        let ddl = "CREATE TABLE items (qty INT CHECK (qty IN (1, 2)), price DECIMAL(10, 2));";

        let parsed = DdlSchemaParser::new().parse("shop", ddl).unwrap();

        assert_eq!(parsed.fragments.len(), 1);
        assert!(parsed.fragments[0]
            .document()
            .contains("Columns: qty (INT), price (DECIMAL(10, 2))"));
    }

    #[test]
    fn dollar_quoted_bodies_do_not_split() {
        let ddl = "CREATE FUNCTION f() RETURNS void AS $$ BEGIN PERFORM 1; END; $$ LANGUAGE plpgsql;\n\
                   CREATE TABLE t (id INT);";

        let parsed = DdlSchemaParser::new().parse("db", ddl).unwrap();

        assert_eq!(parsed.fragment_ids(), vec!["db:statement-0", "db:t"]);
    }

    #[test]
    fn constraints_are_not_columns() {
        let ddl = "CREATE TABLE order_items (\n\
                     order_id INT,\n\
                     product_id INT,\n\
                     PRIMARY KEY (order_id, product_id),\n\
                     FOREIGN KEY (order_id) REFERENCES orders(id)\n\
                   );";

        let columns = extract_columns(&strip_comments(ddl));

        assert_eq!(
            columns,
            vec![
                ("order_id".to_string(), "INT".to_string()),
                ("product_id".to_string(), "INT".to_string()),
            ]
        );
    }

    #[test]
    fn recognizes_views_indexes_and_quoted_names() {
        let ddl = "CREATE TABLE IF NOT EXISTS `public`.`Orders` (id INT);\n\
                   CREATE OR REPLACE VIEW big_orders AS SELECT * FROM Orders WHERE id > 10;\n\
                   CREATE UNIQUE INDEX idx_orders_id ON Orders (id);\n\
                   ALTER TABLE Orders ADD COLUMN note TEXT;";

        let parsed = DdlSchemaParser::new().parse("db", ddl).unwrap();
        let kinds: Vec<FragmentKind> = parsed.fragments.iter().map(|f| f.kind()).collect();

        assert_eq!(
            parsed.fragment_ids(),
            vec![
                "db:public.Orders",
                "db:big_orders",
                "db:idx_orders_id",
                "db:statement-3"
            ]
        );
        assert_eq!(
            kinds,
            vec![
                FragmentKind::Table,
                FragmentKind::View,
                FragmentKind::Index,
                FragmentKind::Statement
            ]
        );
    }

    #[test]
    fn duplicate_names_get_suffixes() {
        let ddl = "CREATE TABLE items (id INT); CREATE TABLE items (id BIGINT);";

        let parsed = DdlSchemaParser::new().parse("orders", ddl).unwrap();

        assert_eq!(parsed.fragment_ids(), vec!["orders:items", "orders:items#2"]);
    }

    #[test]
    fn empty_and_comment_only_definitions_are_parse_errors() {
        let parser = DdlSchemaParser::new();

        assert!(matches!(parser.parse("s", ""), Err(DomainError::ParseError(_))));
        assert!(matches!(parser.parse("s", "  \n"), Err(DomainError::ParseError(_))));
        assert!(matches!(
            parser.parse("s", "-- nothing here\n/* still nothing */"),
            Err(DomainError::ParseError(_))
        ));
    }

    #[test]
    fn free_text_becomes_a_single_statement() {
        let parsed = DdlSchemaParser::new()
            .parse("notes", "orders have a total and belong to customers")
            .unwrap();

        assert_eq!(parsed.fragment_ids(), vec!["notes:statement-0"]);
    }

    #[test]
    fn parses_structured_json() {
        let json = r#"{
            "database_name": "ShopDB",
            "sql_language": "PostgreSQL",
            "tables": [
                {
                    "table_name": "orders",
                    "description": "One row per order",
                    "columns": [
                        { "column_name": "id", "type": "INT", "is_pk": true },
                        { "column_name": "total", "type": "FLOAT", "description": "Order total" }
                    ]
                }
            ]
        }"#;

        let parsed = DdlSchemaParser::new().parse("ShopDB", json).unwrap();

        assert_eq!(parsed.format, SchemaFormat::Structured);
        assert_eq!(parsed.fragment_ids(), vec!["ShopDB:orders"]);
        let document = parsed.fragments[0].document();
        assert!(document.contains("Table description: One row per order"));
        assert!(document.contains("SQL Language: PostgreSQL"));
        assert!(document.contains("total (FLOAT) - Order total"));
    }

    #[test]
    fn invalid_structured_json_is_a_parse_error() {
        let json = r#"{ "database_name": "ShopDB", "tables": [ { "columns": [] } ] }"#;

        let err = DdlSchemaParser::new().parse("ShopDB", json).unwrap_err();

        assert!(matches!(err, DomainError::ParseError(_)));
        assert!(err.to_string().contains("table_name"));
    }

    #[test]
    fn ddl_converts_to_structured_and_back() {
        let ddl = "-- Database: ShopDB\n\
                   -- Language: PostgreSQL\n\
                   -- Description: Orders and customers\n\
                   -- Table: orders - One row per order\n\
                   CREATE TABLE orders (id INT PRIMARY KEY, total DECIMAL(10, 2) NOT NULL);\n\
                   CREATE INDEX idx_total ON orders (total);\n\
                   CREATE TABLE order_items (\n\
                     order_id INT,\n\
                     sku VARCHAR(32),\n\
                     qty INT,\n\
                     PRIMARY KEY (order_id, sku)\n\
                   );";
        let parser = DdlSchemaParser::new();

        let structured = parser.to_structured("fallback", ddl).unwrap();

        assert_eq!(structured.database_name, "ShopDB");
        assert_eq!(structured.sql_language, "PostgreSQL");
        assert_eq!(structured.description, "Orders and customers");
        let names: Vec<&str> = structured.tables.iter().map(|t| t.table_name.as_str()).collect();
        assert_eq!(names, vec!["orders", "order_items"]);

        let orders = &structured.tables[0];
        assert_eq!(orders.description, "One row per order");
        assert_eq!(orders.columns[0].column_name, "id");
        assert!(orders.columns[0].is_pk);
        assert_eq!(orders.columns[1].column_type, "DECIMAL(10, 2)");
        assert!(!orders.columns[1].is_pk);

        let keys: Vec<bool> = structured.tables[1].columns.iter().map(|c| c.is_pk).collect();
        assert_eq!(keys, vec![true, true, false]);

        let rendered = structured.to_ddl();
        let again = parser.to_structured("fallback", &rendered).unwrap();
        assert_eq!(again, structured);
        assert_eq!(again.to_ddl(), rendered);
    }

    #[test]
    fn structured_conversion_keeps_structured_input_and_names_plain_ddl() {
        let parser = DdlSchemaParser::new();
        let json = r#"{"database_name": "ShopDB", "tables": [{"table_name": "t", "columns": []}]}"#;

        assert_eq!(parser.to_structured("other", json).unwrap().database_name, "ShopDB");

        let plain = parser.to_structured("shop", SHOP_DDL).unwrap();
        assert_eq!(plain.database_name, "shop");
        assert_eq!(plain.sql_language, "SQL");
        assert_eq!(plain.tables[0].to_ddl(), "CREATE TABLE orders (\n    id INT,\n    total FLOAT\n);");

        assert!(matches!(
            parser.to_structured("s", "CREATE VIEW v AS SELECT 1;"),
            Err(DomainError::ParseError(_))
        ));
    }

    #[test]
    fn derives_names_like_the_definition_suggests() {
        let parser = DdlSchemaParser::new();

        assert_eq!(parser.derive_name(SHOP_DDL), "Schema_orders");
        assert_eq!(parser.derive_name("SELECT 1;"), "Custom_Schema");
        assert_eq!(
            parser.derive_name(r#"{"database_name": "ShopDB", "tables": []}"#),
            "ShopDB"
        );
    }
}
