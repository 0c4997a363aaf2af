use async_trait::async_trait;
use rand::Rng;
use rand::SeedableRng;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::debug;

use crate::application::EmbeddingService;
use crate::domain::{
    ensure_embeddable, normalize, truncate_for_embedding, DomainError, Embedding, EmbeddingConfig,
    SchemaFragment,
};

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "by", "do", "does", "each", "for", "from", "how", "in", "is", "it",
    "me", "of", "on", "or", "show", "the", "to", "what", "which", "who", "with",
];

/// Deterministic bag-of-words embedding for tests and offline use.
///
/// Every token maps to a pseudo-random unit vector seeded by its hash; a text
/// embeds to the normalized sum of its token vectors, so texts sharing words
/// score higher than unrelated ones.
pub struct MockEmbedding {
    config: EmbeddingConfig,
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self {
            config: EmbeddingConfig::default(),
        }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            config: EmbeddingConfig::new("mock-embedding".to_string(), dimensions, 8192),
        }
    }

    /// Same vectors under a different model name, to exercise model changes.
    pub fn with_model_name(mut self, model_name: &str) -> Self {
        self.config = EmbeddingConfig::new(
            model_name.to_string(),
            self.config.dimensions(),
            self.config.max_input_chars(),
        );
        self
    }

    fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        ensure_embeddable(text)?;
        let text = truncate_for_embedding(text, self.config.max_input_chars());

        let mut vector = vec![0.0f32; self.config.dimensions()];
        for token in tokenize(text) {
            for (acc, x) in vector.iter_mut().zip(self.token_vector(&token)) {
                *acc += x;
            }
        }
        normalize(&mut vector);

        Ok(vector)
    }

    fn token_vector(&self, token: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let seed = hasher.finish();

        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut vector: Vec<f32> = (0..self.config.dimensions())
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();
        normalize(&mut vector);
        vector
    }
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercased alphanumeric words with stopwords dropped and a trailing
/// plural `s` stripped. Falls back to every word when only stopwords remain.
fn tokenize(text: &str) -> Vec<String> {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();

    let content: Vec<String> = words
        .iter()
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .map(|w| stem(w))
        .collect();

    if content.is_empty() {
        words.iter().map(|w| stem(w)).collect()
    } else {
        content
    }
}

fn stem(word: &str) -> String {
    match word.strip_suffix('s') {
        Some(stripped) if word.len() > 3 && !stripped.ends_with('s') => stripped.to_string(),
        _ => word.to_string(),
    }
}

#[async_trait]
impl EmbeddingService for MockEmbedding {
    async fn embed_fragments(
        &self,
        fragments: &[SchemaFragment],
    ) -> Result<Vec<Embedding>, DomainError> {
        let results = fragments
            .iter()
            .map(|fragment| {
                self.generate_embedding(fragment.document()).map(|vector| {
                    Embedding::new(
                        fragment.id().to_string(),
                        vector,
                        self.config.model_name().to_string(),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Generated {} mock embeddings", results.len());

        Ok(results)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, DomainError> {
        self.generate_embedding(query)
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}
