pub mod container;
pub mod controller;
pub mod router;

pub use container::{Container, ContainerConfig, EmbeddingProvider, LlmProvider};
pub use router::Router;
