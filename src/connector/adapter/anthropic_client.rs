use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::StreamExt;
use serde::Deserialize;
use tracing::{debug, warn};

use super::sse;
use crate::application::{ChatClient, TextStream};
use crate::domain::DomainError;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const MAX_TOKENS: u32 = 1024;

#[derive(serde::Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
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
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// One `data:` payload of a streamed Messages response.
#[derive(Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct StreamError {
    #[serde(default)]
    message: String,
}

/// Text carried by a stream event. Only `content_block_delta` events carry
/// text; `error` events fail the stream and the rest are bookkeeping.
fn stream_event_text(payload: &str) -> Option<Result<String, DomainError>> {
    let event: StreamEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(e) => {
            return Some(Err(DomainError::provider_unavailable(format!(
                "AnthropicClient: malformed stream event: {e}"
            ))))
        }
    };

    match event.kind.as_str() {
        "content_block_delta" => event
            .delta
            .and_then(|delta| delta.text)
            .filter(|text| !text.is_empty())
            .map(Ok),
        "error" => Some(Err(DomainError::provider_unavailable(format!(
            "AnthropicClient: stream error: {}",
            event.error.map(|e| e.message).unwrap_or_default()
        )))),
        _ => None,
    }
}

/// HTTP client for the Anthropic Messages API and compatible endpoints such
/// as LM Studio.
///
/// Before each request the client sends `HEAD /` with a 2-second timeout,
/// so an unreachable server fails fast with
/// [`DomainError::ProviderUnavailable`] instead of waiting for the request
/// timeout.
pub struct AnthropicClient {
    client: reqwest::Client,
    reachability_client: reqwest::Client,
    api_key: String,
    model: String,
    /// Full endpoint URL (base + MESSAGES_PATH).
    url: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base: String = base_url.into();
        let trimmed = base.trim_end_matches('/');
        let url = format!("{trimmed}{MESSAGES_PATH}");
        let base_url = format!("{trimmed}/");
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            reachability_client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(2))
                .timeout(Duration::from_secs(2))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            model: model.into(),
            url,
            base_url,
        }
    }

    /// Construct from environment variables:
    ///
    /// | Variable             | Default                     |
    /// |----------------------|-----------------------------|
    /// | `ANTHROPIC_BASE_URL` | `https://api.anthropic.com` |
    /// | `ANTHROPIC_MODEL`    | `claude-3-5-haiku-latest`   |
    /// | `ANTHROPIC_API_KEY`  | `""` (empty)                |
    ///
    /// `model` overrides `ANTHROPIC_MODEL` when given.
    pub fn from_env(model: Option<&str>) -> Self {
        let base = std::env::var("ANTHROPIC_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = model
            .map(String::from)
            .or_else(|| std::env::var("ANTHROPIC_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
        Self::new(key, model, base)
    }
}

impl AnthropicClient {
    async fn ensure_reachable(&self) -> Result<(), DomainError> {
        // Any HTTP response, even 4xx/5xx, means the server is up.
        match self.reachability_client.head(&self.base_url).send().await {
            Err(e) if e.is_connect() || e.is_timeout() => Err(DomainError::provider_unavailable(
                format!(
                    "AnthropicClient: server not reachable at {}: {e}",
                    self.base_url.trim_end_matches('/')
                ),
            )),
            _ => Ok(()),
        }
    }

    fn request<'a>(&'a self, system: &'a str, user: &'a str, stream: bool) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![ApiMessage {
                role: "user",
                content: user,
            }],
            stream,
        }
    }

    async fn post(&self, request: &ApiRequest<'_>) -> Result<reqwest::Response, DomainError> {
        self.ensure_reachable().await?;

        debug!(
            "AnthropicClient: POST {} (model {}, stream {})",
            self.url, self.model, request.stream
        );
        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                DomainError::provider_unavailable(format!("AnthropicClient: request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("AnthropicClient: API returned {status}: {body}");
            return Err(DomainError::provider_unavailable(format!(
                "AnthropicClient: API returned {status}"
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatClient for AnthropicClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, DomainError> {
        let response = self.post(&self.request(system, user, false)).await?;

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            DomainError::provider_unavailable(format!(
                "AnthropicClient: failed to parse response: {e}"
            ))
        })?;

        Ok(api_response
            .content
            .into_iter()
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join(""))
    }

    async fn complete_stream(&self, system: &str, user: &str) -> Result<TextStream, DomainError> {
        let response = self.post(&self.request(system, user, true)).await?;

        let chunks = sse::data_payloads(Box::pin(response.bytes_stream())).filter_map(
            |payload| async move {
                match payload {
                    Ok(payload) => stream_event_text(&payload),
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
