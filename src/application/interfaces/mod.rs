mod chat_client;
mod embedding_service;
mod schema_parser;
mod schema_repository;
mod vector_repository;

pub use chat_client::*;
pub use embedding_service::*;
pub use schema_parser::*;
pub use schema_repository::*;
pub use vector_repository::*;
