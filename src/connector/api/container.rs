use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::application::{
    ChatClient, DeleteSchemaUseCase, EmbeddingService, GenerateSqlUseCase, IngestSchemaUseCase,
    ListSchemasUseCase, RetrieveFragmentsUseCase, SchemaLocks, SchemaRepository, StalePolicy,
    VectorRepository,
};
use crate::connector::adapter::{
    AnthropicClient, DdlSchemaParser, DuckdbSchemaRepository, DuckdbVectorRepository,
    InMemorySchemaRepository, InMemoryVectorRepository, MockChatClient, MockEmbedding,
    OpenAiChatClient, OpenAiEmbedding, OrtEmbedding,
};
use crate::domain::{DistanceMetric, DomainError, PromptTemplate};

const DATABASE_FILE: &str = "sqlrag.duckdb";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingProvider {
    /// ONNX sentence-transformer run in process.
    #[default]
    Local,
    OpenAi,
    Mock,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "ort" => Ok(EmbeddingProvider::Local),
            "openai" => Ok(EmbeddingProvider::OpenAi),
            "mock" => Ok(EmbeddingProvider::Mock),
            other => Err(DomainError::invalid_input(format!(
                "unknown embedding provider '{}', expected local, openai or mock",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    #[default]
    Anthropic,
    OpenAi,
    Groq,
    Mock,
}

impl std::str::FromStr for LlmProvider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(LlmProvider::Anthropic),
            "openai" => Ok(LlmProvider::OpenAi),
            "groq" => Ok(LlmProvider::Groq),
            "mock" => Ok(LlmProvider::Mock),
            other => Err(DomainError::invalid_input(format!(
                "unknown LLM provider '{}', expected anthropic, openai, groq or mock",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContainerConfig {
    pub data_dir: String,
    /// Keep schemas and vectors in memory instead of the DuckDB file.
    pub memory_storage: bool,
    pub embedding_provider: EmbeddingProvider,
    pub embedding_model: Option<String>,
    pub llm_provider: LlmProvider,
    pub llm_model: Option<String>,
    /// Prompt template file; the built-in template is used when unset.
    pub template: Option<PathBuf>,
    pub stale_policy: StalePolicy,
    pub metric: DistanceMetric,
}

/// Wires adapters into use cases from an explicit [`ContainerConfig`].
pub struct Container {
    parser: Arc<DdlSchemaParser>,
    embedding_service: Arc<dyn EmbeddingService>,
    chat_client: Arc<dyn ChatClient>,
    vector_repo: Arc<dyn VectorRepository>,
    schema_repo: Arc<dyn SchemaRepository>,
    locks: Arc<SchemaLocks>,
    template: PromptTemplate,
    config: ContainerConfig,
}

impl Container {
    pub async fn new(config: ContainerConfig) -> Result<Self> {
        let parser = Arc::new(DdlSchemaParser::new());

        let embedding_service: Arc<dyn EmbeddingService> = match config.embedding_provider {
            EmbeddingProvider::Mock => {
                debug!("Using mock embedding service");
                Arc::new(MockEmbedding::new())
            }
            EmbeddingProvider::OpenAi => {
                debug!("Using OpenAI-compatible embedding service");
                Arc::new(OpenAiEmbedding::from_env(config.embedding_model.as_deref())?)
            }
            EmbeddingProvider::Local => {
                debug!("Initializing ONNX embedding service...");
                Arc::new(OrtEmbedding::new(config.embedding_model.as_deref())?)
            }
        };

        let chat_client: Arc<dyn ChatClient> = match config.llm_provider {
            LlmProvider::Anthropic => Arc::new(AnthropicClient::from_env(config.llm_model.as_deref())),
            LlmProvider::OpenAi => {
                Arc::new(OpenAiChatClient::openai_from_env(config.llm_model.as_deref()))
            }
            LlmProvider::Groq => Arc::new(OpenAiChatClient::groq_from_env(config.llm_model.as_deref())),
            LlmProvider::Mock => Arc::new(MockChatClient::new()),
        };
        debug!("Using chat model {}", chat_client.model_name());

        let (vector_repo, schema_repo): (Arc<dyn VectorRepository>, Arc<dyn SchemaRepository>) =
            if config.memory_storage {
                debug!("Using in-memory storage");
                (
                    Arc::new(InMemoryVectorRepository::with_metric(config.metric)),
                    Arc::new(InMemorySchemaRepository::new()),
                )
            } else {
                let db_path = PathBuf::from(&config.data_dir).join(DATABASE_FILE);
                debug!("Using DuckDB storage at {:?}", db_path);
                // DuckDB allows one write connection per file; both stores share it.
                let vectors = DuckdbVectorRepository::new(&db_path)?.with_metric(config.metric);
                let schemas = DuckdbSchemaRepository::with_connection(vectors.shared_connection())?;
                (Arc::new(vectors), Arc::new(schemas))
            };

        let template = match &config.template {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read prompt template {}", path.display()))?;
                info!("Using prompt template from {}", path.display());
                PromptTemplate::new(text)?
            }
            None => PromptTemplate::default(),
        };

        Ok(Self {
            parser,
            embedding_service,
            chat_client,
            vector_repo,
            schema_repo,
            locks: Arc::new(SchemaLocks::new()),
            template,
            config,
        })
    }

    pub fn ingest_use_case(&self) -> IngestSchemaUseCase {
        IngestSchemaUseCase::new(
            self.schema_repo.clone(),
            self.vector_repo.clone(),
            self.parser.clone(),
            self.embedding_service.clone(),
            self.locks.clone(),
        )
    }

    pub fn retrieve_use_case(&self) -> RetrieveFragmentsUseCase {
        let use_case = RetrieveFragmentsUseCase::new(
            self.schema_repo.clone(),
            self.vector_repo.clone(),
            self.embedding_service.clone(),
        );

        match self.config.stale_policy {
            StalePolicy::Reject => use_case,
            StalePolicy::Reingest => use_case.with_reingest(Arc::new(self.ingest_use_case())),
        }
    }

    pub fn generate_use_case(&self) -> GenerateSqlUseCase {
        GenerateSqlUseCase::new(Arc::new(self.retrieve_use_case()), self.chat_client.clone())
            .with_template(self.template.clone())
    }

    pub fn list_use_case(&self) -> ListSchemasUseCase {
        ListSchemasUseCase::new(self.schema_repo.clone(), self.parser.clone())
    }

    pub fn delete_use_case(&self) -> DeleteSchemaUseCase {
        DeleteSchemaUseCase::new(
            self.schema_repo.clone(),
            self.vector_repo.clone(),
            self.locks.clone(),
        )
    }

    pub fn data_dir(&self) -> &str {
        &self.config.data_dir
    }

    pub fn memory_storage(&self) -> bool {
        self.config.memory_storage
    }

    pub fn embedding_model(&self) -> &str {
        self.embedding_service.config().model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_parse_case_insensitively() {
        assert_eq!("OpenAI".parse::<EmbeddingProvider>().unwrap(), EmbeddingProvider::OpenAi);
        assert_eq!("groq".parse::<LlmProvider>().unwrap(), LlmProvider::Groq);
        assert!("cohere".parse::<LlmProvider>().is_err());
    }

    #[tokio::test]
    async fn missing_template_file_fails_startup() {
        let config = ContainerConfig {
            memory_storage: true,
            embedding_provider: EmbeddingProvider::Mock,
            llm_provider: LlmProvider::Mock,
            template: Some(PathBuf::from("/nonexistent/template.txt")),
            ..Default::default()
        };

        assert!(Container::new(config).await.is_err());
    }
}
