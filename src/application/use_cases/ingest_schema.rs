use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::application::{EmbeddingService, SchemaParser, SchemaRepository, VectorRepository};
use crate::domain::{DomainError, Embedding, SchemaFragment, SchemaRecord};

use super::SchemaLocks;

const EMBED_BATCH_SIZE: usize = 32;

/// What an ingestion did.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    record: SchemaRecord,
    fragment_ids: Vec<String>,
    rebuilt: bool,
}

impl IngestOutcome {
    pub fn record(&self) -> &SchemaRecord {
        &self.record
    }

    pub fn fragment_ids(&self) -> &[String] {
        &self.fragment_ids
    }

    /// False when the stored index already matched the definition.
    pub fn rebuilt(&self) -> bool {
        self.rebuilt
    }
}

pub struct IngestSchemaUseCase {
    schema_repo: Arc<dyn SchemaRepository>,
    vector_repo: Arc<dyn VectorRepository>,
    parser: Arc<dyn SchemaParser>,
    embedding_service: Arc<dyn EmbeddingService>,
    locks: Arc<SchemaLocks>,
}

impl IngestSchemaUseCase {
    pub fn new(
        schema_repo: Arc<dyn SchemaRepository>,
        vector_repo: Arc<dyn VectorRepository>,
        parser: Arc<dyn SchemaParser>,
        embedding_service: Arc<dyn EmbeddingService>,
        locks: Arc<SchemaLocks>,
    ) -> Self {
        Self {
            schema_repo,
            vector_repo,
            parser,
            embedding_service,
            locks,
        }
    }

    /// Splits, embeds and indexes `definition` under `schema_name`.
    ///
    /// The new index replaces the old one only once every fragment has been
    /// embedded, so a failure leaves the previous index searchable. Unless
    /// `force` is set, an unchanged definition that is already indexed with
    /// the current embedding model is not rebuilt.
    pub async fn execute(
        &self,
        schema_name: &str,
        definition: &str,
        force: bool,
    ) -> Result<IngestOutcome, DomainError> {
        let schema_name = schema_name.trim();
        if schema_name.is_empty() {
            return Err(DomainError::invalid_input("schema name must not be empty"));
        }

        let _guard = self.locks.acquire(schema_name).await;

        let parsed = self.parser.parse(schema_name, definition)?;
        let model = self.embedding_service.config().model_name().to_string();

        let existing = self.schema_repo.find_by_name(schema_name).await?;

        if let Some(record) = &existing {
            if !force
                && record.has_definition(definition)
                && record.is_fresh_for(&model)
                && self.vector_repo.is_indexed(schema_name).await?
            {
                info!(
                    "Schema '{}' is unchanged and already indexed; skipping rebuild",
                    schema_name
                );
                return Ok(IngestOutcome {
                    record: record.clone(),
                    fragment_ids: parsed.fragment_ids(),
                    rebuilt: false,
                });
            }
        }

        let mut record = match existing {
            Some(mut record) => {
                record.update_definition(parsed.format, definition.to_string());
                record
            }
            None => SchemaRecord::new(
                schema_name.to_string(),
                parsed.format,
                definition.to_string(),
            ),
        };
        self.schema_repo.save(&record).await?;

        info!(
            "Ingesting schema '{}' ({} definition, {} fragments) with {}",
            schema_name,
            parsed.format,
            parsed.fragments.len(),
            model
        );
        let start_time = Instant::now();

        let embeddings = self.embed_fragments(&parsed.fragments).await?;
        let dimensions = embeddings.first().map(Embedding::dimensions).unwrap_or(0);

        self.vector_repo
            .replace(schema_name, &parsed.fragments, &embeddings)
            .await?;

        record.mark_indexed(parsed.fragments.len() as u64, &model, dimensions);
        self.schema_repo.save(&record).await?;

        info!(
            "Ingestion complete: schema '{}', {} fragments, {} dimensions in {:.2}s",
            schema_name,
            parsed.fragments.len(),
            dimensions,
            start_time.elapsed().as_secs_f64()
        );

        Ok(IngestOutcome {
            record,
            fragment_ids: parsed.fragment_ids(),
            rebuilt: true,
        })
    }

    /// Like [`IngestSchemaUseCase::execute`], naming the schema after its own
    /// definition.
    pub async fn execute_auto(
        &self,
        definition: &str,
        force: bool,
    ) -> Result<IngestOutcome, DomainError> {
        let schema_name = self.parser.derive_name(definition);
        debug!("Derived schema name '{}' from definition", schema_name);
        self.execute(&schema_name, definition, force).await
    }

    async fn embed_fragments(
        &self,
        fragments: &[SchemaFragment],
    ) -> Result<Vec<Embedding>, DomainError> {
        let progress_bar = ProgressBar::new(fragments.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );
        progress_bar.set_message("embedding fragments");

        let mut embeddings = Vec::with_capacity(fragments.len());
        for batch in fragments.chunks(EMBED_BATCH_SIZE) {
            let batch_embeddings = match self.embedding_service.embed_fragments(batch).await {
                Ok(e) => e,
                Err(e) => {
                    progress_bar.abandon_with_message("failed");
                    return Err(e);
                }
            };
            if batch_embeddings.len() != batch.len() {
                progress_bar.abandon_with_message("failed");
                return Err(DomainError::internal(format!(
                    "embedding provider returned {} vectors for {} fragments",
                    batch_embeddings.len(),
                    batch.len()
                )));
            }
            debug!("Embedded batch of {} fragments", batch.len());
            embeddings.extend(batch_embeddings);
            progress_bar.inc(batch.len() as u64);
        }

        progress_bar.finish_and_clear();
        Ok(embeddings)
    }
}
