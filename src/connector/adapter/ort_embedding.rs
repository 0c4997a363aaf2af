use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::application::EmbeddingService;
use crate::domain::{
    ensure_embeddable, normalize, truncate_for_embedding, DomainError, Embedding, EmbeddingConfig,
    SchemaFragment,
};

pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
const DEFAULT_DIMENSIONS: usize = 384;
const MAX_SEQ_LENGTH: usize = 256;
const MAX_INPUT_CHARS: usize = 8192;

/// Local sentence-transformer embeddings run through ONNX Runtime.
///
/// The model and tokenizer are fetched from the Hugging Face hub on first
/// use and cached. Token sequences are cut at 256 tokens and mean-pooled.
pub struct OrtEmbedding {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    config: EmbeddingConfig,
}

impl OrtEmbedding {
    pub fn new(model_id: Option<&str>) -> Result<Self, DomainError> {
        let model_id = model_id.unwrap_or(DEFAULT_MODEL_ID);
        info!("Initializing ORT embedding service with model: {}", model_id);

        let api = hf_hub::api::sync::ApiBuilder::new()
            .with_progress(true)
            .build()
            .map_err(|e| {
                DomainError::provider_unavailable(format!("Failed to create HF API: {}", e))
            })?;

        let repo = api.model(model_id.to_string());

        let tokenizer_path = repo.get("tokenizer.json").map_err(|e| {
            DomainError::provider_unavailable(format!("Failed to download tokenizer: {}", e))
        })?;

        let model_path = repo
            .get("model.onnx")
            .or_else(|_| repo.get("onnx/model.onnx"))
            .map_err(|e| {
                DomainError::provider_unavailable(format!("Failed to download ONNX model: {}", e))
            })?;

        Self::from_paths(model_path, tokenizer_path, model_id)
    }

    pub fn from_paths(
        model_path: PathBuf,
        tokenizer_path: PathBuf,
        model_name: &str,
    ) -> Result<Self, DomainError> {
        info!("Loading ONNX model from: {:?}", model_path);

        let session = Session::builder()
            .map_err(|e| {
                DomainError::provider_unavailable(format!("Failed to create session builder: {}", e))
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                DomainError::provider_unavailable(format!("Failed to set optimization level: {}", e))
            })?
            .commit_from_file(&model_path)
            .map_err(|e| {
                DomainError::provider_unavailable(format!("Failed to load ONNX model: {}", e))
            })?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            DomainError::provider_unavailable(format!("Failed to load tokenizer: {}", e))
        })?;

        let config = EmbeddingConfig::new(model_name.to_string(), DEFAULT_DIMENSIONS, MAX_INPUT_CHARS);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            config,
        })
    }

    fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, DomainError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        for text in texts {
            ensure_embeddable(text)?;
        }
        let inputs: Vec<&str> = texts
            .iter()
            .map(|t| truncate_for_embedding(t, self.config.max_input_chars()))
            .collect();

        let encodings = self
            .tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| DomainError::internal(format!("Tokenization failed: {}", e)))?;

        let batch_size = encodings.len();
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(MAX_SEQ_LENGTH);

        let mut input_ids: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut attention_mask: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut token_type_ids: Vec<i64> = Vec::with_capacity(batch_size * max_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let type_ids = encoding.get_type_ids();

            let len = ids.len().min(max_len);

            input_ids.extend(ids[..len].iter().map(|&x| x as i64));
            attention_mask.extend(mask[..len].iter().map(|&x| x as i64));
            token_type_ids.extend(type_ids[..len].iter().map(|&x| x as i64));

            let padding = max_len - len;
            input_ids.extend(std::iter::repeat_n(0i64, padding));
            attention_mask.extend(std::iter::repeat_n(0i64, padding));
            token_type_ids.extend(std::iter::repeat_n(0i64, padding));
        }

        let shape = [batch_size, max_len];
        let input_ids_tensor = Tensor::from_array((shape, input_ids))
            .map_err(|e| DomainError::internal(format!("Failed to create input_ids tensor: {}", e)))?;
        let attention_mask_tensor = Tensor::from_array((shape, attention_mask)).map_err(|e| {
            DomainError::internal(format!("Failed to create attention_mask tensor: {}", e))
        })?;
        let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids)).map_err(|e| {
            DomainError::internal(format!("Failed to create token_type_ids tensor: {}", e))
        })?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| DomainError::internal(format!("Failed to lock session: {}", e)))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor,
            ])
            .map_err(|e| DomainError::provider_unavailable(format!("Inference failed: {}", e)))?;

        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| DomainError::internal("No output tensor found"))?;

        let (shape, data) = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| DomainError::internal(format!("Failed to extract output tensor: {}", e)))?;

        let shape: Vec<usize> = shape.iter().map(|&x| x as usize).collect();
        debug!("Output tensor shape: {:?}", shape);

        let vectors: Vec<Vec<f32>> = match shape.as_slice() {
            // Token embeddings: mean-pool over the attention mask.
            [_, seq_len, hidden_size] => {
                let (seq_len, hidden_size) = (*seq_len, *hidden_size);
                encodings
                    .iter()
                    .enumerate()
                    .map(|(i, encoding)| {
                        let mut pooled = vec![0.0f32; hidden_size];
                        let mut count = 0.0f32;
                        let mask = encoding.get_attention_mask();

                        for (j, &m) in mask.iter().enumerate().take(seq_len.min(max_len)) {
                            if m == 0 {
                                continue;
                            }
                            let offset = i * seq_len * hidden_size + j * hidden_size;
                            for (k, value) in pooled.iter_mut().enumerate() {
                                *value += data[offset + k];
                            }
                            count += 1.0;
                        }

                        if count > 0.0 {
                            pooled.iter_mut().for_each(|v| *v /= count);
                        }
                        normalize(&mut pooled);
                        pooled
                    })
                    .collect()
            }
            // Already pooled sentence embeddings.
            [_, hidden_size] => {
                let hidden_size = *hidden_size;
                (0..batch_size)
                    .map(|i| {
                        let mut pooled = data[i * hidden_size..(i + 1) * hidden_size].to_vec();
                        normalize(&mut pooled);
                        pooled
                    })
                    .collect()
            }
            _ => {
                return Err(DomainError::internal(format!(
                    "Unexpected output tensor shape: {:?}",
                    shape
                )))
            }
        };

        if let Some(v) = vectors.iter().find(|v| v.len() != self.config.dimensions()) {
            return Err(DomainError::dimension_mismatch(self.config.dimensions(), v.len()));
        }

        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingService for OrtEmbedding {
    async fn embed_fragments(
        &self,
        fragments: &[SchemaFragment],
    ) -> Result<Vec<Embedding>, DomainError> {
        let texts: Vec<&str> = fragments.iter().map(|f| f.document()).collect();
        let vectors = self.embed_texts(&texts)?;

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
        let vectors = self.embed_texts(&[query])?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::internal("Failed to generate query embedding"))
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "Requires model download"]
    async fn test_ort_embedding_service() {
        let service = OrtEmbedding::new(None).expect("Failed to create service");

        let embedding = service
            .embed_query("CREATE TABLE orders (id INT, total FLOAT);")
            .await
            .unwrap();

        assert_eq!(embedding.len(), DEFAULT_DIMENSIONS);

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[tokio::test]
    #[ignore = "Requires model download"]
    async fn test_ort_embedding_is_deterministic() {
        let service = OrtEmbedding::new(None).expect("Failed to create service");

        let first = service.embed_query("total for an order").await.unwrap();
        let second = service.embed_query("total for an order").await.unwrap();

        assert_eq!(first, second);
    }
}
