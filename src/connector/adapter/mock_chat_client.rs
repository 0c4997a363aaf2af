use async_trait::async_trait;
use futures_util::stream;
use tokio::sync::Mutex;

use crate::application::{ChatClient, TextStream};
use crate::domain::DomainError;

/// Returns a canned response and records every prompt it receives. Streamed
/// responses arrive one line per chunk.
pub struct MockChatClient {
    response: String,
    prompts: Mutex<Vec<String>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::with_response("```sql\nSELECT 1;\n```")
    }

    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// User prompts received so far, oldest first.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, DomainError> {
        self.prompts.lock().await.push(user.to_string());
        Ok(self.response.clone())
    }

    async fn complete_stream(&self, _system: &str, user: &str) -> Result<TextStream, DomainError> {
        self.prompts.lock().await.push(user.to_string());
        let chunks: Vec<Result<String, DomainError>> = self
            .response
            .split_inclusive('\n')
            .map(|line| Ok(line.to_string()))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}
