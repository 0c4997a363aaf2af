use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use duckdb::{params, Connection, Row};
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::SchemaRepository;
use crate::domain::{DomainError, SchemaFormat, SchemaRecord};

const SELECT_COLUMNS: &str = "SELECT name, format, definition, definition_hash, fresh, fragment_count, \
    embedding_model, dimensions, created_at, updated_at FROM schemas";

/// Schema records persisted in DuckDB.
pub struct DuckdbSchemaRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DuckdbSchemaRepository {
    pub fn new(db_path: &Path) -> Result<Self, DomainError> {
        let conn = Connection::open(db_path)
            .map_err(|e| DomainError::storage(format!("Failed to open DuckDB database: {}", e)))?;
        Self::with_connection(Arc::new(Mutex::new(conn)))
    }

    pub fn in_memory() -> Result<Self, DomainError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            DomainError::storage(format!("Failed to open DuckDB in-memory DB: {}", e))
        })?;
        Self::with_connection(Arc::new(Mutex::new(conn)))
    }

    /// Create a new adapter using an existing shared connection, creating the
    /// `schemas` table if needed.
    pub fn with_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, DomainError> {
        {
            let guard = conn.try_lock().map_err(|_| {
                DomainError::storage("DuckDB connection is busy during initialization")
            })?;
            Self::initialize_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    pub fn shared_connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn initialize_schema(conn: &Connection) -> Result<(), DomainError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schemas (
                name TEXT PRIMARY KEY,
                format TEXT NOT NULL,
                definition TEXT NOT NULL,
                definition_hash TEXT NOT NULL,
                fresh BOOLEAN NOT NULL,
                fragment_count BIGINT DEFAULT 0,
                embedding_model TEXT,
                dimensions BIGINT,
                created_at BIGINT NOT NULL,
                updated_at BIGINT NOT NULL
            );
            "#,
        )
        .map_err(|e| DomainError::storage(format!("Failed to initialize schema: {}", e)))?;

        debug!("DuckDB schema table initialized");
        Ok(())
    }

    fn row_to_record(row: &Row<'_>) -> duckdb::Result<SchemaRecord> {
        let format: String = row.get(1)?;
        Ok(SchemaRecord::reconstitute(
            row.get(0)?,
            SchemaFormat::from_str(&format),
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get::<_, i64>(5)? as u64,
            row.get(6)?,
            row.get::<_, Option<i64>>(7)?.map(|d| d as usize),
            row.get(8)?,
            row.get(9)?,
        ))
    }
}

#[async_trait]
impl SchemaRepository for DuckdbSchemaRepository {
    async fn save(&self, record: &SchemaRecord) -> Result<(), DomainError> {
        let conn = self.conn.lock().await;

        conn.execute(
            r#"
            INSERT INTO schemas (name, format, definition, definition_hash, fresh, fragment_count, embedding_model, dimensions, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT (name) DO UPDATE SET
                format = excluded.format,
                definition = excluded.definition,
                definition_hash = excluded.definition_hash,
                fresh = excluded.fresh,
                fragment_count = excluded.fragment_count,
                embedding_model = excluded.embedding_model,
                dimensions = excluded.dimensions,
                updated_at = excluded.updated_at
            "#,
            params![
                record.name(),
                record.format().as_str(),
                record.definition(),
                record.definition_hash(),
                record.is_fresh(),
                record.fragment_count() as i64,
                record.embedding_model(),
                record.dimensions().map(|d| d as i64),
                record.created_at(),
                record.updated_at(),
            ],
        )
        .map_err(|e| DomainError::storage(format!("Failed to save schema: {}", e)))?;

        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<SchemaRecord>, DomainError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!("{} WHERE name = ?1", SELECT_COLUMNS))
            .map_err(|e| DomainError::storage(format!("Failed to prepare statement: {}", e)))?;

        match stmt.query_row(params![name], Self::row_to_record) {
            Ok(record) => Ok(Some(record)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DomainError::storage(format!(
                "Failed to query schema: {}",
                e
            ))),
        }
    }

    async fn list(&self) -> Result<Vec<SchemaRecord>, DomainError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!("{} ORDER BY name", SELECT_COLUMNS))
            .map_err(|e| DomainError::storage(format!("Failed to prepare statement: {}", e)))?;

        let rows = stmt
            .query_map([], Self::row_to_record)
            .map_err(|e| DomainError::storage(format!("Failed to query schemas: {}", e)))?;

        let mut records = Vec::new();
        for row in rows {
            records
                .push(row.map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))?);
        }
        Ok(records)
    }

    async fn delete(&self, name: &str) -> Result<bool, DomainError> {
        let conn = self.conn.lock().await;
        let removed = conn
            .execute("DELETE FROM schemas WHERE name = ?", params![name])
            .map_err(|e| DomainError::storage(format!("Failed to delete schema: {}", e)))?;
        Ok(removed > 0)
    }
}
