use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::application::EmbeddingService;
use crate::domain::{
    ensure_embeddable, truncate_for_embedding, DomainError, Embedding, EmbeddingConfig,
    SchemaFragment,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const EMBEDDINGS_PATH: &str = "/v1/embeddings";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_DIMENSIONS: usize = 1536;
const MAX_INPUT_CHARS: usize = 8000;

#[derive(serde::Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct ApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Embeddings from an OpenAI-compatible `/v1/embeddings` endpoint.
pub struct OpenAiEmbedding {
    client: reqwest::Client,
    api_key: String,
    url: String,
    config: EmbeddingConfig,
    send_dimensions: bool,
}

impl OpenAiEmbedding {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        let base: String = base_url.into();
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            url: format!("{}{EMBEDDINGS_PATH}", base.trim_end_matches('/')),
            config: EmbeddingConfig::new(model.into(), dimensions, MAX_INPUT_CHARS),
            send_dimensions: false,
        }
    }

    /// Asks the endpoint to shorten vectors to the configured dimensions.
    /// Only the `text-embedding-3` family honours the parameter.
    pub fn with_requested_dimensions(mut self) -> Self {
        self.send_dimensions = true;
        self
    }

    /// Reads `OPENAI_BASE_URL`, `OPENAI_API_KEY`, `OPENAI_EMBEDDING_MODEL`
    /// (default `text-embedding-3-small`) and `OPENAI_EMBEDDING_DIMENSIONS`
    /// (default 1536). `model` overrides the model variable when given.
    /// An explicit dimensions variable is also sent with every request.
    pub fn from_env(model: Option<&str>) -> Result<Self, DomainError> {
        let base =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let model = model
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_EMBEDDING_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        match std::env::var("OPENAI_EMBEDDING_DIMENSIONS") {
            Ok(value) => {
                let dimensions = value
                    .parse::<usize>()
                    .ok()
                    .filter(|d| *d > 0)
                    .ok_or_else(|| {
                        DomainError::invalid_input(format!(
                            "OPENAI_EMBEDDING_DIMENSIONS must be a positive integer, got '{}'",
                            value
                        ))
                    })?;
                Ok(Self::new(key, base, model, dimensions).with_requested_dimensions())
            }
            Err(_) => Ok(Self::new(key, base, model, DEFAULT_DIMENSIONS)),
        }
    }

    fn request<'a>(&'a self, texts: &[&'a str]) -> ApiRequest<'a> {
        ApiRequest {
            model: self.config.model_name(),
            input: texts
                .iter()
                .copied()
                .map(|t| truncate_for_embedding(t, self.config.max_input_chars()))
                .collect(),
            dimensions: self.send_dimensions.then_some(self.config.dimensions()),
        }
    }

    async fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, DomainError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        for text in texts {
            ensure_embeddable(text)?;
        }

        let request = self.request(texts);

        debug!("OpenAiEmbedding: embedding {} texts", texts.len());
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                DomainError::provider_unavailable(format!("OpenAiEmbedding: request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("OpenAiEmbedding: API returned {status}: {body}");
            return Err(DomainError::provider_unavailable(format!(
                "OpenAiEmbedding: API returned {status}"
            )));
        }

        let mut api_response: ApiResponse = response.json().await.map_err(|e| {
            DomainError::provider_unavailable(format!(
                "OpenAiEmbedding: failed to parse response: {e}"
            ))
        })?;

        if api_response.data.len() != texts.len() {
            return Err(DomainError::provider_unavailable(format!(
                "OpenAiEmbedding: expected {} embeddings, got {}",
                texts.len(),
                api_response.data.len()
            )));
        }
        api_response.data.sort_by_key(|d| d.index);

        let vectors: Vec<Vec<f32>> = api_response.data.into_iter().map(|d| d.embedding).collect();
        if let Some(v) = vectors.iter().find(|v| v.len() != self.config.dimensions()) {
            return Err(DomainError::dimension_mismatch(self.config.dimensions(), v.len()));
        }

        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbedding {
    async fn embed_fragments(
        &self,
        fragments: &[SchemaFragment],
    ) -> Result<Vec<Embedding>, DomainError> {
        let texts: Vec<&str> = fragments.iter().map(|f| f.document()).collect();
        let vectors = self.embed_texts(&texts).await?;

        Ok(fragments
            .iter()
            .zip(vectors)
            .map(|(fragment, vector)| {
                Embedding::new(
                    fragment.id().to_string(),
                    vector,
                    self.config.model_name().to_string(),
                )
            })
            .collect())
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, DomainError> {
        self.embed_texts(&[query])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::internal("Failed to generate query embedding"))
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}
