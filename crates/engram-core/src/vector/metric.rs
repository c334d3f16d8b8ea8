//! Distance Metrics
//!
//! All metrics return "smaller = closer" distances so the graph search can
//! rank uniformly. Similarities for thresholding are derived per metric.

use serde::{Deserialize, Serialize};

/// Distance metric over embedding vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - (a.b)/(|a||b|)`; identical vectors -> 0, opposite -> 2
    #[default]
    Cosine,
    /// L2 norm of the difference
    Euclidean,
    /// Negated inner product, so smaller = more similar
    Dot,
    /// Sum of absolute component differences
    Manhattan,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Dot => "dot",
            DistanceMetric::Manhattan => "manhattan",
        }
    }

    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "euclidean" => DistanceMetric::Euclidean,
            "dot" => DistanceMetric::Dot,
            "manhattan" => DistanceMetric::Manhattan,
            _ => DistanceMetric::Cosine,
        }
    }

    /// Distance between two equal-length vectors.
    ///
    /// Callers are responsible for length checks; mismatches are handled
    /// one level up where "worst possible" is well defined.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => {
                let mut dot = 0.0f32;
                let mut norm_a = 0.0f32;
                let mut norm_b = 0.0f32;
                for (x, y) in a.iter().zip(b.iter()) {
                    dot += x * y;
                    norm_a += x * x;
                    norm_b += y * y;
                }
                if norm_a == 0.0 || norm_b == 0.0 {
                    // Cosine is undefined against the zero vector; treat as
                    // orthogonal.
                    return 1.0;
                }
                1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
            }
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
            DistanceMetric::Dot => -a.iter().zip(b.iter()).map(|(x, y)| x * y).sum::<f32>(),
            DistanceMetric::Manhattan => {
                a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
            }
        }
    }

    /// Convert a distance into a similarity for threshold filtering.
    ///
    /// cosine: `1 - d`; dot: `-d`; euclidean/manhattan: `1/(1+d)`.
    pub fn similarity(&self, distance: f32) -> f32 {
        match self {
            DistanceMetric::Cosine => 1.0 - distance,
            DistanceMetric::Dot => -distance,
            DistanceMetric::Euclidean | DistanceMetric::Manhattan => 1.0 / (1.0 + distance),
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_bounds() {
        let a = [1.0, 0.0];
        assert!(DistanceMetric::Cosine.distance(&a, &[1.0, 0.0]).abs() < 1e-6);
        assert!((DistanceMetric::Cosine.distance(&a, &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((DistanceMetric::Cosine.distance(&a, &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(DistanceMetric::Cosine.distance(&[0.0, 0.0], &[1.0, 2.0]), 1.0);
    }

    #[test]
    fn test_euclidean() {
        let d = DistanceMetric::Euclidean.distance(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((d - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_dot_is_negated() {
        let d = DistanceMetric::Dot.distance(&[1.0, 2.0], &[3.0, 4.0]);
        assert!((d + 11.0).abs() < 1e-6);
    }

    #[test]
    fn test_manhattan() {
        let d = DistanceMetric::Manhattan.distance(&[1.0, -1.0], &[-2.0, 3.0]);
        assert!((d - 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_conversions() {
        assert!((DistanceMetric::Cosine.similarity(0.25) - 0.75).abs() < 1e-6);
        assert!((DistanceMetric::Dot.similarity(-3.0) - 3.0).abs() < 1e-6);
        assert!((DistanceMetric::Euclidean.similarity(1.0) - 0.5).abs() < 1e-6);
        assert!((DistanceMetric::Manhattan.similarity(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_metric_roundtrip() {
        for metric in [
            DistanceMetric::Cosine,
            DistanceMetric::Euclidean,
            DistanceMetric::Dot,
            DistanceMetric::Manhattan,
        ] {
            assert_eq!(DistanceMetric::parse_name(metric.as_str()), metric);
        }
    }
}
