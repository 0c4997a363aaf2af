use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::StreamExt;
use serde::Deserialize;
use tracing::{debug, warn};

use super::sse;
use crate::application::{ChatClient, TextStream};
use crate::domain::DomainError;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai";
const COMPLETIONS_PATH: &str = "/v1/chat/completions";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
const GROQ_DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const MAX_TOKENS: u32 = 1024;
const STREAM_DONE: &str = "[DONE]";

#[derive(serde::Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(serde::Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<ResponseMessage>,
}

/// Text carried by one streamed completion chunk. The `[DONE]` sentinel and
/// role-only deltas carry none.
fn stream_chunk_text(payload: &str) -> Option<Result<String, DomainError>> {
    if payload.trim() == STREAM_DONE {
        return None;
    }
    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .filter(|text| !text.is_empty())
            .map(Ok),
        Err(e) => Some(Err(DomainError::provider_unavailable(format!(
            "OpenAiChatClient: malformed stream chunk: {e}"
        )))),
    }
}

/// HTTP client for OpenAI-style chat completion endpoints (OpenAI, Groq).
pub struct OpenAiChatClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAiChatClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base: String = base_url.into();
        let url = format!("{}{COMPLETIONS_PATH}", base.trim_end_matches('/'));
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            model: model.into(),
            url,
        }
    }

    /// `OPENAI_BASE_URL`, `OPENAI_API_KEY` and `OPENAI_MODEL`
    /// (default `gpt-4o-mini`).
    pub fn openai_from_env(model: Option<&str>) -> Self {
        let base =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| OPENAI_BASE_URL.to_string());
        let model = model
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_MODEL").ok())
            .unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string());
        let key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        Self::new(key, model, base)
    }

    /// `GROQ_API_KEY` and `GROQ_MODEL` (default `llama-3.3-70b-versatile`).
    pub fn groq_from_env(model: Option<&str>) -> Self {
        let model = model
            .map(String::from)
            .or_else(|| std::env::var("GROQ_MODEL").ok())
            .unwrap_or_else(|| GROQ_DEFAULT_MODEL.to_string());
        let key = std::env::var("GROQ_API_KEY").unwrap_or_default();
        Self::new(key, model, GROQ_BASE_URL)
    }
}

impl OpenAiChatClient {
    fn request<'a>(&'a self, system: &'a str, user: &'a str, stream: bool) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: 0.0,
            messages: vec![
                ApiMessage {
                    role: "system",
                    content: system,
                },
                ApiMessage {
                    role: "user",
                    content: user,
                },
            ],
            stream,
        }
    }

    async fn post(&self, request: &ApiRequest<'_>) -> Result<reqwest::Response, DomainError> {
        debug!(
            "OpenAiChatClient: POST {} (model {}, stream {})",
            self.url, self.model, request.stream
        );
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                DomainError::provider_unavailable(format!("OpenAiChatClient: request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("OpenAiChatClient: API returned {status}: {body}");
            return Err(DomainError::provider_unavailable(format!(
                "OpenAiChatClient: API returned {status}"
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, DomainError> {
        let response = self.post(&self.request(system, user, false)).await?;

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            DomainError::provider_unavailable(format!(
                "OpenAiChatClient: failed to parse response: {e}"
            ))
        })?;

        Ok(api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    async fn complete_stream(&self, system: &str, user: &str) -> Result<TextStream, DomainError> {
        let response = self.post(&self.request(system, user, true)).await?;

        let chunks = sse::data_payloads(Box::pin(response.bytes_stream())).filter_map(
            |payload| async move {
                match payload {
                    Ok(payload) => stream_chunk_text(&payload),
                    Err(e) => Some(Err(e)),
                }
            },
        );
        Ok(Box::pin(chunks))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
