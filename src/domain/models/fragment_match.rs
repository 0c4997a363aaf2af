use serde::{Deserialize, Serialize};

use super::{DistanceMetric, SchemaFragment};

/// A schema fragment returned by a vector search, with its score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentMatch {
    fragment: SchemaFragment,
    score: f32,
    metric: DistanceMetric,
}

impl FragmentMatch {
    pub fn new(fragment: SchemaFragment, score: f32, metric: DistanceMetric) -> Self {
        Self {
            fragment,
            score,
            metric,
        }
    }

    pub fn fragment(&self) -> &SchemaFragment {
        &self.fragment
    }

    pub fn fragment_id(&self) -> &str {
        self.fragment.id()
    }

    pub fn content(&self) -> &str {
        self.fragment.content()
    }

    /// Similarity for cosine indexes, distance for L2 indexes.
    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn display_line(&self) -> String {
        let label = match self.metric {
            DistanceMetric::Cosine => "score",
            DistanceMetric::L2 => "distance",
        };
        format!("{} ({}: {:.3})", self.fragment.id(), label, self.score)
    }
}
