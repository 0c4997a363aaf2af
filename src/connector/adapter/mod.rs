mod anthropic_client;
mod ddl_schema_parser;
mod duckdb_schema_repository;
mod duckdb_vector_repository;
mod in_memory_schema_repository;
mod in_memory_vector_repository;
mod mock_chat_client;
mod mock_embedding;
mod openai_chat_client;
mod openai_embedding;
mod ort_embedding;
mod sse;
mod vector_scoring;

pub use anthropic_client::AnthropicClient;
pub use ddl_schema_parser::*;
pub use duckdb_schema_repository::*;
pub use duckdb_vector_repository::*;
pub use in_memory_schema_repository::*;
pub use in_memory_vector_repository::*;
pub use mock_chat_client::*;
pub use mock_embedding::*;
pub use openai_chat_client::*;
pub use openai_embedding::OpenAiEmbedding;
pub use ort_embedding::OrtEmbedding;
