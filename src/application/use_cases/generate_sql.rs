use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, info};

use crate::application::ChatClient;
use crate::domain::{DomainError, GeneratedSql, PromptTemplate};

use super::RetrieveFragmentsUseCase;

/// System instruction sent ahead of every rendered prompt.
pub const SYSTEM_PROMPT: &str = "You are an expert SQL developer. Write a single SQL query that \
answers the user's question using only the tables and columns in the provided schema \
fragments. Return the query in a ```sql fenced code block.";

/// Answers a natural-language question with SQL grounded in retrieved
/// schema fragments.
pub struct GenerateSqlUseCase {
    retrieval: Arc<RetrieveFragmentsUseCase>,
    chat_client: Arc<dyn ChatClient>,
    template: PromptTemplate,
}

impl GenerateSqlUseCase {
    pub fn new(retrieval: Arc<RetrieveFragmentsUseCase>, chat_client: Arc<dyn ChatClient>) -> Self {
        Self {
            retrieval,
            chat_client,
            template: PromptTemplate::default(),
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    pub async fn execute(
        &self,
        schema_name: &str,
        question: &str,
        k: usize,
    ) -> Result<GeneratedSql, DomainError> {
        let (prompt, fragment_ids) = self.prepare(schema_name, question, k).await?;

        let response = self.chat_client.complete(SYSTEM_PROMPT, &prompt).await?;

        Ok(GeneratedSql::new(
            schema_name.to_string(),
            question.to_string(),
            response,
            fragment_ids,
            prompt,
        ))
    }

    /// Like [`GenerateSqlUseCase::execute`], handing each piece of the
    /// response to `on_chunk` as it arrives. The returned result holds the
    /// whole response. An error from `on_chunk` stops generation.
    pub async fn execute_streaming<F>(
        &self,
        schema_name: &str,
        question: &str,
        k: usize,
        mut on_chunk: F,
    ) -> Result<GeneratedSql, DomainError>
    where
        F: FnMut(&str) -> Result<(), DomainError>,
    {
        let (prompt, fragment_ids) = self.prepare(schema_name, question, k).await?;

        let mut chunks = self.chat_client.complete_stream(SYSTEM_PROMPT, &prompt).await?;
        let mut response = String::new();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            on_chunk(&chunk)?;
            response.push_str(&chunk);
        }
        debug!("Streamed response complete ({} chars)", response.len());

        Ok(GeneratedSql::new(
            schema_name.to_string(),
            question.to_string(),
            response,
            fragment_ids,
            prompt,
        ))
    }

    /// Retrieves fragments and renders the prompt, returning it with the
    /// ids of the fragments it contains, best first.
    async fn prepare(
        &self,
        schema_name: &str,
        question: &str,
        k: usize,
    ) -> Result<(String, Vec<String>), DomainError> {
        let matches = self.retrieval.execute(schema_name, question, k).await?;

        let prompt = self.template.render(question, &matches);
        debug!("Rendered prompt ({} chars):\n{}", prompt.len(), prompt);

        info!(
            "Generating SQL for '{}' with {} ({} fragments in context)",
            schema_name,
            self.chat_client.model_name(),
            matches.len()
        );

        let fragment_ids = matches
            .iter()
            .map(|m| m.fragment_id().to_string())
            .collect();
        Ok((prompt, fragment_ids))
    }
}
