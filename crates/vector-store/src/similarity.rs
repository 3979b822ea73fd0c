//! Scoring functions for [`crate::VectorStore::search`].
//!
//! All functions follow "higher is more similar". None of them validate
//! input: vectors of different lengths are compared over their common
//! prefix, and zero-norm vectors make [`cosine_similarity`] return NaN.

use std::sync::Arc;

/// Pluggable scoring function used by a search.
pub type SimilarityFn = Arc<dyn Fn(&[f32], &[f32]) -> f32 + Send + Sync>;

/// `dot(a, b) / (|a| * |b|)`.
///
/// A zero-norm operand yields `0.0 / 0.0`, i.e. NaN. That is deliberate:
/// degenerate vectors produce an undefined score rather than a made-up one.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (norm_a * norm_b)
}

#[must_use]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// `1 / (1 + |a - b|)`, so identical vectors score 1.0.
#[must_use]
pub fn euclidean_similarity(a: &[f32], b: &[f32]) -> f32 {
    let distance = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt();
    1.0 / (1.0 + distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]);
        assert!((sim - 1.0).abs() < 1e-6);

        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(sim.abs() < 1e-6);

        let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[-1.0, -2.0, -3.0]);
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_is_scale_invariant() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.7, 0.7]);
        assert!((sim - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_zero_vector_is_nan() {
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).is_nan());
        assert!(cosine_similarity(&[], &[]).is_nan());
    }

    #[test]
    fn dot_product_and_euclidean() {
        assert!((dot_product(&[1.0, 2.0], &[1.0, 2.0]) - 5.0).abs() < 1e-6);
        assert!((euclidean_similarity(&[3.0, 4.0], &[3.0, 4.0]) - 1.0).abs() < 1e-6);
        assert!((euclidean_similarity(&[0.0, 0.0], &[3.0, 4.0]) - 1.0 / 6.0).abs() < 1e-6);
    }
}
