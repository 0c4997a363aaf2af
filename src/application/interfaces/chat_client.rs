use std::pin::Pin;

use async_trait::async_trait;
use futures_util::stream::{self, Stream};

use crate::domain::DomainError;

/// Pieces of response text in arrival order. Concatenated, they equal what
/// [`ChatClient::complete`] would have returned.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, DomainError>> + Send>>;

/// Text-generation model that turns a rendered prompt into SQL.
///
/// Transport and vendor request formats stay inside the implementation.
/// Failures to reach the model surface as
/// [`DomainError::ProviderUnavailable`]; the response text is returned
/// untouched.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// One round trip: `system` instruction plus a single `user` message.
    async fn complete(&self, system: &str, user: &str) -> Result<String, DomainError>;

    /// Same request as [`ChatClient::complete`], yielding text as the model
    /// produces it. Clients without a streaming transport send the whole
    /// response as one chunk.
    async fn complete_stream(&self, system: &str, user: &str) -> Result<TextStream, DomainError> {
        let text = self.complete(system, user).await?;
        Ok(Box::pin(stream::once(async move { Ok::<_, DomainError>(text) })))
    }

    fn model_name(&self) -> &str;
}
