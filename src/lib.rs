pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use cli::{Commands, OutputFormat};

pub use application::{
    ChatClient, DeleteSchemaUseCase, EmbeddingService, GenerateSqlUseCase, IngestOutcome,
    IngestSchemaUseCase, ListSchemasUseCase, ParsedSchema, RetrieveFragmentsUseCase,
    SchemaLocks, SchemaParser, SchemaRepository, StalePolicy, TextStream, VectorRepository,
};

pub use connector::{
    AnthropicClient, Container, ContainerConfig, DdlSchemaParser, DuckdbSchemaRepository,
    DuckdbVectorRepository, EmbeddingProvider, InMemorySchemaRepository,
    InMemoryVectorRepository, LlmProvider, MockChatClient, MockEmbedding, OpenAiChatClient,
    OpenAiEmbedding, OrtEmbedding, Router,
};

pub use domain::{
    DistanceMetric, DomainError, Embedding, EmbeddingConfig, FragmentKind, FragmentMatch,
    GeneratedSql, PromptTemplate, SchemaFormat, SchemaFragment, SchemaInfo, SchemaRecord,
    StructuredSchema,
};
