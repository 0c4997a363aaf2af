use std::collections::HashSet;

use crate::domain::{DistanceMetric, DomainError, Embedding, FragmentMatch, SchemaFragment};

/// Checks a replacement batch and returns its dimensionality.
///
/// Fragments and embeddings must pair up one-to-one in the same order, belong
/// to `schema_name` with unique ids, and share one vector length.
pub(crate) fn validate_replacement(
    schema_name: &str,
    fragments: &[SchemaFragment],
    embeddings: &[Embedding],
) -> Result<usize, DomainError> {
    if fragments.len() != embeddings.len() {
        return Err(DomainError::invalid_input(format!(
            "{} fragments but {} embeddings",
            fragments.len(),
            embeddings.len()
        )));
    }

    let dimensions = embeddings.first().map(Embedding::dimensions).unwrap_or(0);
    let mut seen = HashSet::with_capacity(fragments.len());
    for (fragment, embedding) in fragments.iter().zip(embeddings) {
        if fragment.schema_name() != schema_name {
            return Err(DomainError::invalid_input(format!(
                "fragment {} belongs to schema '{}', not '{}'",
                fragment.id(),
                fragment.schema_name(),
                schema_name
            )));
        }
        if fragment.id() != embedding.fragment_id() {
            return Err(DomainError::invalid_input(format!(
                "embedding for {} paired with fragment {}",
                embedding.fragment_id(),
                fragment.id()
            )));
        }
        if !seen.insert(fragment.id()) {
            return Err(DomainError::invalid_input(format!(
                "duplicate fragment id {}",
                fragment.id()
            )));
        }
        if embedding.dimensions() != dimensions {
            return Err(DomainError::dimension_mismatch(
                dimensions,
                embedding.dimensions(),
            ));
        }
    }

    Ok(dimensions)
}

/// Exact nearest neighbours, best-first. The sort is stable, so equal scores
/// keep the order in which entries were stored.
pub(crate) fn rank<'a>(
    entries: impl IntoIterator<Item = (&'a SchemaFragment, &'a [f32])>,
    query_vector: &[f32],
    k: usize,
    metric: DistanceMetric,
) -> Vec<FragmentMatch> {
    let mut scored: Vec<(&SchemaFragment, f32)> = entries
        .into_iter()
        .map(|(fragment, vector)| (fragment, metric.score(query_vector, vector)))
        .collect();

    scored.sort_by(|a, b| metric.compare(a.1, b.1));

    scored
        .into_iter()
        .take(k)
        .map(|(fragment, score)| FragmentMatch::new(fragment.clone(), score, metric))
        .collect()
}

pub(crate) fn ensure_k(k: usize) -> Result<(), DomainError> {
    if k == 0 {
        return Err(DomainError::invalid_input("k must be at least 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FragmentKind;

    fn fragment(name: &str) -> SchemaFragment {
        SchemaFragment::new("shop", 0, FragmentKind::Table, Some(name.to_string()), "ddl")
    }

    #[test]
    fn rank_orders_cosine_best_first_and_keeps_ties_stable() {
        let a = fragment("a");
        let b = fragment("b");
        let c = fragment("c");
        let va = vec![1.0, 0.0];
        let vb = vec![0.0, 1.0];
        let vc = vec![1.0, 0.0];

        let ranked = rank(
            [(&a, va.as_slice()), (&b, vb.as_slice()), (&c, vc.as_slice())],
            &[1.0, 0.0],
            3,
            DistanceMetric::Cosine,
        );

        let ids: Vec<&str> = ranked.iter().map(|m| m.fragment_id()).collect();
        assert_eq!(ids, vec!["shop:a", "shop:c", "shop:b"]);
    }

    #[test]
    fn rank_orders_l2_smallest_distance_first() {
        let a = fragment("a");
        let b = fragment("b");
        let va = vec![5.0, 0.0];
        let vb = vec![1.0, 0.0];

        let ranked = rank(
            [(&a, va.as_slice()), (&b, vb.as_slice())],
            &[0.0, 0.0],
            1,
            DistanceMetric::L2,
        );

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].fragment_id(), "shop:b");
        assert!((ranked[0].score() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn validate_rejects_mixed_dimensions() {
        let fragments = vec![fragment("a"), fragment("b")];
        let embeddings = vec![
            Embedding::new("shop:a".to_string(), vec![1.0, 0.0], "m".to_string()),
            Embedding::new("shop:b".to_string(), vec![1.0], "m".to_string()),
        ];

        let err = validate_replacement("shop", &fragments, &embeddings).unwrap_err();

        assert!(matches!(
            err,
            DomainError::DimensionMismatch { expected: 2, actual: 1 }
        ));
    }

    #[test]
    fn validate_rejects_misaligned_ids() {
        let fragments = vec![fragment("a")];
        let embeddings = vec![Embedding::new("shop:b".to_string(), vec![1.0], "m".to_string())];

        assert!(matches!(
            validate_replacement("shop", &fragments, &embeddings),
            Err(DomainError::InvalidInput(_))
        ));
    }
}
