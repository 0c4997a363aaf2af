use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::{EmbeddingService, SchemaRepository, VectorRepository};
use crate::domain::{DomainError, FragmentMatch};

use super::IngestSchemaUseCase;

/// What to do when a question targets a schema whose index is out of date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalePolicy {
    /// Fail with [`DomainError::StaleIndex`].
    #[default]
    Reject,
    /// Rebuild the index from the stored definition, then answer.
    Reingest,
}

impl StalePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StalePolicy::Reject => "reject",
            StalePolicy::Reingest => "reingest",
        }
    }
}

impl std::str::FromStr for StalePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(StalePolicy::Reject),
            "reingest" | "re-ingest" => Ok(StalePolicy::Reingest),
            other => Err(DomainError::invalid_input(format!(
                "unknown stale policy '{}', expected reject or reingest",
                other
            ))),
        }
    }
}

/// Embeds a question and finds the closest fragments of one schema.
pub struct RetrieveFragmentsUseCase {
    schema_repo: Arc<dyn SchemaRepository>,
    vector_repo: Arc<dyn VectorRepository>,
    embedding_service: Arc<dyn EmbeddingService>,
    reingest: Option<Arc<IngestSchemaUseCase>>,
}

impl RetrieveFragmentsUseCase {
    pub fn new(
        schema_repo: Arc<dyn SchemaRepository>,
        vector_repo: Arc<dyn VectorRepository>,
        embedding_service: Arc<dyn EmbeddingService>,
    ) -> Self {
        Self {
            schema_repo,
            vector_repo,
            embedding_service,
            reingest: None,
        }
    }

    /// Switches to [`StalePolicy::Reingest`], rebuilding stale indexes with
    /// the given use case.
    pub fn with_reingest(mut self, ingest: Arc<IngestSchemaUseCase>) -> Self {
        self.reingest = Some(ingest);
        self
    }

    pub fn stale_policy(&self) -> StalePolicy {
        if self.reingest.is_some() {
            StalePolicy::Reingest
        } else {
            StalePolicy::Reject
        }
    }

    pub async fn execute(
        &self,
        schema_name: &str,
        question: &str,
        k: usize,
    ) -> Result<Vec<FragmentMatch>, DomainError> {
        if question.trim().is_empty() {
            return Err(DomainError::invalid_input("question must not be empty"));
        }
        if k == 0 {
            return Err(DomainError::invalid_input("k must be at least 1"));
        }

        self.ensure_fresh(schema_name).await?;

        let query_vector = self.embedding_service.embed_query(question).await?;
        let matches = self
            .vector_repo
            .search(schema_name, &query_vector, k)
            .await?;

        debug!(
            "Retrieved {} fragments from '{}': {:?}",
            matches.len(),
            schema_name,
            matches.iter().map(|m| m.fragment_id()).collect::<Vec<_>>()
        );

        Ok(matches)
    }

    async fn ensure_fresh(&self, schema_name: &str) -> Result<(), DomainError> {
        let record = self
            .schema_repo
            .find_by_name(schema_name)
            .await?
            .ok_or_else(|| DomainError::schema_not_found(schema_name))?;

        let model = self.embedding_service.config().model_name();
        if record.is_fresh_for(model) {
            return Ok(());
        }

        match &self.reingest {
            None => {
                warn!(
                    "Schema '{}' is stale (indexed with {:?}, current model {}); re-ingest it first",
                    schema_name,
                    record.embedding_model(),
                    model
                );
                Err(DomainError::stale_index(schema_name))
            }
            Some(ingest) => {
                info!(
                    "Schema '{}' is stale; re-ingesting its stored definition",
                    schema_name
                );
                ingest.execute(schema_name, record.definition(), true).await?;
                Ok(())
            }
        }
    }
}
