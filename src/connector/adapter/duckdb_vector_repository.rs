use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use duckdb::{params, Connection};
use tokio::sync::Mutex;
use tracing::debug;

use super::vector_scoring::{ensure_k, rank, validate_replacement};
use crate::application::VectorRepository;
use crate::domain::{
    DistanceMetric, DomainError, Embedding, FragmentKind, FragmentMatch, SchemaFragment,
};

/// Vector index persisted in DuckDB.
///
/// Vectors are stored as little-endian `f32` blobs and scored exactly in
/// process. A schema's rows are replaced inside one transaction, so readers
/// never see a half-built partition. Each row records the metric it was
/// indexed under, and searching with a different metric is refused.
pub struct DuckdbVectorRepository {
    conn: Arc<Mutex<Connection>>,
    metric: DistanceMetric,
}

impl DuckdbVectorRepository {
    pub fn new(path: &Path) -> Result<Self, DomainError> {
        let conn = Connection::open(path)
            .map_err(|e| DomainError::storage(format!("Failed to open DuckDB database: {}", e)))?;
        Self::with_connection(Arc::new(Mutex::new(conn)))
    }

    pub fn in_memory() -> Result<Self, DomainError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            DomainError::storage(format!("Failed to open DuckDB in-memory DB: {}", e))
        })?;
        Self::with_connection(Arc::new(Mutex::new(conn)))
    }

    /// Uses an existing connection, creating the fragment table if needed.
    /// DuckDB allows one write connection per file, so adapters over the same
    /// file share it.
    pub fn with_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, DomainError> {
        {
            let guard = conn.try_lock().map_err(|_| {
                DomainError::storage("DuckDB connection is busy during initialization")
            })?;
            Self::initialize(&guard)?;
        }
        Ok(Self {
            conn,
            metric: DistanceMetric::default(),
        })
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn shared_connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn initialize(conn: &Connection) -> Result<(), DomainError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_fragments (
                schema_name TEXT NOT NULL,
                fragment_id TEXT NOT NULL,
                ordinal BIGINT NOT NULL,
                position BIGINT NOT NULL,
                kind TEXT NOT NULL,
                object_name TEXT,
                content TEXT NOT NULL,
                document TEXT NOT NULL,
                vector BLOB NOT NULL,
                dimensions BIGINT NOT NULL,
                model TEXT NOT NULL,
                metric TEXT NOT NULL DEFAULT 'cosine'
            );
            ALTER TABLE schema_fragments ADD COLUMN IF NOT EXISTS metric TEXT DEFAULT 'cosine';
            "#,
        )
        .map_err(|e| DomainError::storage(format!("Failed to initialize DuckDB tables: {}", e)))?;

        debug!("DuckDB fragment table initialized");
        Ok(())
    }
}

fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn blob_to_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

#[async_trait]
impl VectorRepository for DuckdbVectorRepository {
    async fn replace(
        &self,
        schema_name: &str,
        fragments: &[SchemaFragment],
        embeddings: &[Embedding],
    ) -> Result<(), DomainError> {
        let dimensions = validate_replacement(schema_name, fragments, embeddings)?;

        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        tx.execute(
            "DELETE FROM schema_fragments WHERE schema_name = ?",
            params![schema_name],
        )
        .map_err(|e| DomainError::storage(format!("Failed to clear fragments: {}", e)))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO schema_fragments \
                    (schema_name, fragment_id, ordinal, position, kind, object_name, content, document, vector, dimensions, model, metric) \
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .map_err(|e| {
                    DomainError::storage(format!("Failed to prepare fragment insert: {}", e))
                })?;

            for (ordinal, (fragment, embedding)) in fragments.iter().zip(embeddings).enumerate() {
                stmt.execute(params![
                    schema_name,
                    fragment.id(),
                    ordinal as i64,
                    fragment.position() as i64,
                    fragment.kind().as_str(),
                    fragment.object_name(),
                    fragment.content(),
                    fragment.document(),
                    vector_to_blob(embedding.vector()),
                    dimensions as i64,
                    embedding.model(),
                    self.metric.as_str(),
                ])
                .map_err(|e| {
                    DomainError::storage(format!(
                        "Failed to insert fragment {}: {}",
                        fragment.id(),
                        e
                    ))
                })?;
            }
        }

        tx.commit()
            .map_err(|e| DomainError::storage(format!("Failed to commit: {}", e)))?;

        debug!(
            "Replaced DuckDB index for '{}' with {} fragments",
            schema_name,
            fragments.len()
        );
        Ok(())
    }

    async fn search(
        &self,
        schema_name: &str,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<FragmentMatch>, DomainError> {
        ensure_k(k)?;

        let entries = {
            let conn = self.conn.lock().await;
            let mut stmt = conn
                .prepare(
                    "SELECT fragment_id, position, kind, object_name, content, document, vector, metric \
                    FROM schema_fragments WHERE schema_name = ? ORDER BY ordinal",
                )
                .map_err(|e| DomainError::storage(format!("Failed to prepare search: {}", e)))?;

            let rows = stmt
                .query_map(params![schema_name], |row| {
                    let kind: String = row.get(2)?;
                    let blob: Vec<u8> = row.get(6)?;
                    let metric: Option<String> = row.get(7)?;
                    Ok((
                        SchemaFragment::reconstitute(
                            row.get(0)?,
                            schema_name.to_string(),
                            row.get::<_, i64>(1)? as u32,
                            FragmentKind::from_str(&kind),
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                        ),
                        blob_to_vector(&blob),
                        metric,
                    ))
                })
                .map_err(|e| DomainError::storage(format!("Failed to run search: {}", e)))?;

            let mut entries = Vec::new();
            for row in rows {
                entries.push(
                    row.map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))?,
                );
            }
            entries
        };

        let Some((_, first, stored_metric)) = entries.first() else {
            return Err(DomainError::schema_not_indexed(schema_name));
        };
        let stored_metric = stored_metric.as_deref().unwrap_or("cosine");
        if stored_metric != self.metric.as_str() {
            return Err(DomainError::invalid_input(format!(
                "Schema '{}' was indexed with the {} metric but {} is configured; re-ingest with --force",
                schema_name,
                stored_metric,
                self.metric.as_str()
            )));
        }
        if query_vector.len() != first.len() {
            return Err(DomainError::dimension_mismatch(first.len(), query_vector.len()));
        }

        Ok(rank(
            entries.iter().map(|(f, v, _)| (f, v.as_slice())),
            query_vector,
            k,
            self.metric,
        ))
    }

    async fn delete_by_schema(&self, schema_name: &str) -> Result<u64, DomainError> {
        let conn = self.conn.lock().await;
        let removed = conn
            .execute(
                "DELETE FROM schema_fragments WHERE schema_name = ?",
                params![schema_name],
            )
            .map_err(|e| DomainError::storage(format!("Failed to delete fragments: {}", e)))?;
        Ok(removed as u64)
    }

    async fn count(&self, schema_name: &str) -> Result<u64, DomainError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM schema_fragments WHERE schema_name = ?",
                params![schema_name],
                |row| row.get(0),
            )
            .map_err(|e| DomainError::storage(format!("Failed to count fragments: {}", e)))?;
        Ok(count as u64)
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_round_trip_preserves_values() {
        let vector = vec![0.5, -1.25, 3.0e-7];

        assert_eq!(blob_to_vector(&vector_to_blob(&vector)), vector);
    }
}
