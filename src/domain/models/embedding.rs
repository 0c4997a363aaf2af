use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Represents a vector embedding for a schema fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    fragment_id: String,
    vector: Vec<f32>,
    model: String,
}

impl Embedding {
    pub fn new(fragment_id: String, vector: Vec<f32>, model: String) -> Self {
        Self {
            fragment_id,
            vector,
            model,
        }
    }

    pub fn fragment_id(&self) -> &str {
        &self.fragment_id
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }
}

/// Configuration for the embedding model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    model_name: String,
    dimensions: usize,
    /// Inputs longer than this many characters are truncated before embedding.
    max_input_chars: usize,
}

impl EmbeddingConfig {
    pub fn new(model_name: String, dimensions: usize, max_input_chars: usize) -> Self {
        Self {
            model_name,
            dimensions,
            max_input_chars,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: "mock-embedding".to_string(),
            dimensions: 384,
            max_input_chars: 8192,
        }
    }
}

/// Rejects text that would produce a meaningless embedding.
pub fn ensure_embeddable(text: &str) -> Result<(), DomainError> {
    if text.trim().is_empty() {
        return Err(DomainError::invalid_input("cannot embed empty text"));
    }
    Ok(())
}

/// Cuts `text` to at most `max_chars` characters, never splitting a code point.
pub fn truncate_for_embedding(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Similarity metric used by a vector index. Fixed per index instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine similarity; higher scores are better.
    #[default]
    Cosine,
    /// Euclidean distance; lower scores are better.
    L2,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::L2 => "l2",
        }
    }

    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => cosine_similarity(a, b),
            DistanceMetric::L2 => l2_distance(a, b),
        }
    }

    /// Orders two scores best-first. NaN always ranks last.
    pub fn compare(&self, a: f32, b: f32) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match self {
                DistanceMetric::Cosine => b.total_cmp(&a),
                DistanceMetric::L2 => a.total_cmp(&b),
            },
        }
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            other => Err(DomainError::invalid_input(format!(
                "unknown distance metric '{}', expected cosine or l2",
                other
            ))),
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Scales a vector to unit length in place. Zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in vector.iter_mut() {
            *x /= magnitude;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_for_embedding("héllo", 2), "hé");
        assert_eq!(truncate_for_embedding("abc", 10), "abc");
        assert_eq!(truncate_for_embedding("abc", 0), "");
    }

    #[test]
    fn ensure_embeddable_rejects_blank_text() {
        assert!(matches!(
            ensure_embeddable("   \n"),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(ensure_embeddable("orders").is_ok());
    }

    #[test]
    fn cosine_prefers_higher_scores() {
        let metric = DistanceMetric::Cosine;
        assert_eq!(metric.compare(0.9, 0.1), Ordering::Less);
        assert_eq!(metric.compare(0.1, 0.9), Ordering::Greater);
    }

    #[test]
    fn l2_prefers_lower_scores() {
        let metric = DistanceMetric::L2;
        assert_eq!(metric.compare(0.1, 0.9), Ordering::Less);
        assert!((metric.score(&[0.0, 3.0], &[4.0, 0.0]) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn nan_scores_rank_last_for_both_metrics() {
        for metric in [DistanceMetric::Cosine, DistanceMetric::L2] {
            let mut scores = vec![f32::NAN, 0.5, f32::NAN, 0.2];
            scores.sort_by(|a, b| metric.compare(*a, *b));

            assert!(!scores[0].is_nan() && !scores[1].is_nan(), "{metric}: {scores:?}");
            assert!(scores[2].is_nan() && scores[3].is_nan(), "{metric}: {scores:?}");
        }
        assert_eq!(DistanceMetric::Cosine.compare(f32::NAN, -1.0), Ordering::Greater);
        assert_eq!(DistanceMetric::L2.compare(1e9, f32::NAN), Ordering::Less);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn metric_parses_aliases() {
        assert_eq!("euclidean".parse::<DistanceMetric>().unwrap(), DistanceMetric::L2);
        assert_eq!("COSINE".parse::<DistanceMetric>().unwrap(), DistanceMetric::Cosine);
        assert!("dot".parse::<DistanceMetric>().is_err());
    }
}
