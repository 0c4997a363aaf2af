//! # Connector Layer
//!
//! External integrations implementing the application interfaces:
//! - Embedding providers (ONNX Runtime, OpenAI-compatible HTTP, mock)
//! - Vector and schema storage (DuckDB, in-memory)
//! - Chat clients (Anthropic, OpenAI/Groq, mock)
//! - The DDL / structured schema parser
//!
//! The `api` module wires them together for the CLI.

pub mod adapter;
pub mod api;

pub use adapter::*;
pub use api::*;
