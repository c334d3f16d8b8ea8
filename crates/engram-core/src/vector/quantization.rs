//! Vector Quantization
//!
//! Compressed in-memory representations trading accuracy for footprint:
//!
//! | scheme        | stored bits/dim | compression |
//! |---------------|-----------------|-------------|
//! | none          | 32              | 1x          |
//! | scalar (8-bit)| 8               | 4x          |
//! | product       | 4 (grouped)     | 8x          |
//! | binary (sign) | 1               | 32x         |
//!
//! Distances computed on compressed forms approximate the raw metric;
//! exact-zero identities hold only for the `none` scheme. A stored vector
//! whose dimension differs from the query yields the worst possible
//! distance instead of failing.

use serde::{Deserialize, Serialize};

use super::metric::DistanceMetric;

/// Quantization scheme for stored vectors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum Quantization {
    /// Raw f32 storage
    #[default]
    None,
    /// One sign bit per dimension
    Binary,
    /// Per-vector min/max with 8-bit codes
    Scalar,
    /// Contiguous subvector groups, 4-bit codes with per-group min/max
    Product {
        #[serde(default = "default_subvectors")]
        subvectors: usize,
    },
}

fn default_subvectors() -> usize {
    8
}

impl Quantization {
    /// Stored-bits compression ratio relative to f32.
    pub fn compression_ratio(&self) -> f32 {
        match self {
            Quantization::None => 1.0,
            Quantization::Scalar => 4.0,
            Quantization::Product { .. } => 8.0,
            Quantization::Binary => 32.0,
        }
    }

    /// Encode a raw vector under this scheme.
    pub fn encode(&self, vector: &[f32]) -> StoredVector {
        match self {
            Quantization::None => StoredVector::Raw(vector.to_vec()),
            Quantization::Binary => {
                let mut bits = vec![0u8; vector.len().div_ceil(8)];
                for (i, v) in vector.iter().enumerate() {
                    if *v >= 0.0 {
                        bits[i / 8] |= 1 << (i % 8);
                    }
                }
                StoredVector::Binary {
                    bits,
                    len: vector.len(),
                }
            }
            Quantization::Scalar => {
                let (min, max) = min_max(vector);
                let scale = if max > min { (max - min) / 255.0 } else { 0.0 };
                let codes = vector
                    .iter()
                    .map(|v| {
                        if scale == 0.0 {
                            0
                        } else {
                            ((v - min) / scale).round().clamp(0.0, 255.0) as u8
                        }
                    })
                    .collect();
                StoredVector::Scalar {
                    codes,
                    min,
                    scale,
                    len: vector.len(),
                }
            }
            Quantization::Product { subvectors } => {
                let groups = (*subvectors).max(1).min(vector.len().max(1));
                let group_size = vector.len().div_ceil(groups.max(1)).max(1);
                let mut mins = Vec::with_capacity(groups);
                let mut scales = Vec::with_capacity(groups);
                let mut nibbles: Vec<u8> = Vec::with_capacity(vector.len());
                for chunk in vector.chunks(group_size) {
                    let (min, max) = min_max(chunk);
                    let scale = if max > min { (max - min) / 15.0 } else { 0.0 };
                    mins.push(min);
                    scales.push(scale);
                    for v in chunk {
                        let code = if scale == 0.0 {
                            0
                        } else {
                            ((v - min) / scale).round().clamp(0.0, 15.0) as u8
                        };
                        nibbles.push(code);
                    }
                }
                // Pack two 4-bit codes per byte.
                let mut codes = vec![0u8; nibbles.len().div_ceil(2)];
                for (i, nibble) in nibbles.iter().enumerate() {
                    codes[i / 2] |= nibble << ((i % 2) * 4);
                }
                StoredVector::Product {
                    codes,
                    mins,
                    scales,
                    len: vector.len(),
                    group_size,
                }
            }
        }
    }
}

fn min_max(values: &[f32]) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for v in values {
        min = min.min(*v);
        max = max.max(*v);
    }
    if values.is_empty() {
        (0.0, 0.0)
    } else {
        (min, max)
    }
}

// ============================================================================
// STORED VECTOR
// ============================================================================

/// A vector as held by the index, possibly compressed
#[derive(Debug, Clone, PartialEq)]
pub enum StoredVector {
    Raw(Vec<f32>),
    Binary {
        bits: Vec<u8>,
        len: usize,
    },
    Scalar {
        codes: Vec<u8>,
        min: f32,
        scale: f32,
        len: usize,
    },
    Product {
        codes: Vec<u8>,
        mins: Vec<f32>,
        scales: Vec<f32>,
        len: usize,
        group_size: usize,
    },
}

impl StoredVector {
    /// Dimensionality of the original vector.
    pub fn len(&self) -> usize {
        match self {
            StoredVector::Raw(v) => v.len(),
            StoredVector::Binary { len, .. }
            | StoredVector::Scalar { len, .. }
            | StoredVector::Product { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate reconstruction of the original vector.
    pub fn decode(&self) -> Vec<f32> {
        match self {
            StoredVector::Raw(v) => v.clone(),
            StoredVector::Binary { bits, len } => (0..*len)
                .map(|i| {
                    if bits[i / 8] & (1 << (i % 8)) != 0 {
                        1.0
                    } else {
                        -1.0
                    }
                })
                .collect(),
            StoredVector::Scalar {
                codes, min, scale, ..
            } => codes.iter().map(|c| min + *c as f32 * scale).collect(),
            StoredVector::Product {
                codes,
                mins,
                scales,
                len,
                group_size,
            } => (0..*len)
                .map(|i| {
                    let group = i / group_size;
                    let nibble = (codes[i / 2] >> ((i % 2) * 4)) & 0x0F;
                    mins[group] + nibble as f32 * scales[group]
                })
                .collect(),
        }
    }

    /// Distance from a raw query to this stored vector.
    ///
    /// Dimension mismatches yield the worst possible distance.
    pub fn distance_to_query(&self, metric: DistanceMetric, query: &[f32]) -> f32 {
        if self.len() != query.len() {
            return f32::INFINITY;
        }
        match self {
            StoredVector::Raw(v) => metric.distance(query, v),
            _ => metric.distance(query, &self.decode()),
        }
    }

    /// Distance between two stored vectors (used during graph construction).
    pub fn distance_to(&self, metric: DistanceMetric, other: &StoredVector) -> f32 {
        if self.len() != other.len() {
            return f32::INFINITY;
        }
        match (self, other) {
            (StoredVector::Raw(a), StoredVector::Raw(b)) => metric.distance(a, b),
            (StoredVector::Raw(a), b) => metric.distance(a, &b.decode()),
            (a, StoredVector::Raw(b)) => metric.distance(&a.decode(), b),
            (a, b) => metric.distance(&a.decode(), &b.decode()),
        }
    }

    /// Bytes held by the compressed payload.
    pub fn size_bytes(&self) -> usize {
        match self {
            StoredVector::Raw(v) => v.len() * 4,
            StoredVector::Binary { bits, .. } => bits.len(),
            StoredVector::Scalar { codes, .. } => codes.len() + 8,
            StoredVector::Product {
                codes, mins, scales, ..
            } => codes.len() + (mins.len() + scales.len()) * 4,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<f32> {
        (0..16).map(|i| (i as f32 * 0.7).sin()).collect()
    }

    #[test]
    fn test_raw_roundtrip_is_exact() {
        let v = sample();
        let stored = Quantization::None.encode(&v);
        assert_eq!(stored.decode(), v);
        assert_eq!(stored.size_bytes(), 64);
    }

    #[test]
    fn test_scalar_roundtrip_is_close() {
        let v = sample();
        let stored = Quantization::Scalar.encode(&v);
        let decoded = stored.decode();
        for (orig, dec) in v.iter().zip(decoded.iter()) {
            assert!((orig - dec).abs() < 0.01, "{orig} vs {dec}");
        }
    }

    #[test]
    fn test_binary_preserves_signs() {
        let v = vec![1.5, -0.3, 0.0, -2.0, 0.7];
        let stored = Quantization::Binary.encode(&v);
        let decoded = stored.decode();
        assert_eq!(decoded, vec![1.0, -1.0, 1.0, -1.0, 1.0]);
        assert_eq!(stored.len(), 5);
    }

    #[test]
    fn test_product_roundtrip_is_coarse_but_bounded() {
        let v = sample();
        let stored = Quantization::Product { subvectors: 4 }.encode(&v);
        let decoded = stored.decode();
        assert_eq!(decoded.len(), v.len());
        for (orig, dec) in v.iter().zip(decoded.iter()) {
            assert!((orig - dec).abs() < 0.2, "{orig} vs {dec}");
        }
    }

    #[test]
    fn test_constant_vector_survives_quantization() {
        let v = vec![0.5f32; 8];
        for q in [
            Quantization::Scalar,
            Quantization::Product { subvectors: 2 },
        ] {
            let decoded = q.encode(&v).decode();
            for d in decoded {
                assert!((d - 0.5).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_dimension_mismatch_is_worst_distance() {
        let stored = Quantization::Scalar.encode(&sample());
        let query = vec![0.0f32; 4];
        assert_eq!(
            stored.distance_to_query(DistanceMetric::Cosine, &query),
            f32::INFINITY
        );
    }

    #[test]
    fn test_compression_ratios() {
        assert_eq!(Quantization::None.compression_ratio(), 1.0);
        assert_eq!(Quantization::Scalar.compression_ratio(), 4.0);
        assert_eq!(
            Quantization::Product { subvectors: 8 }.compression_ratio(),
            8.0
        );
        assert_eq!(Quantization::Binary.compression_ratio(), 32.0);
    }

    #[test]
    fn test_quantized_distance_approximates_raw() {
        let a = sample();
        let b: Vec<f32> = (0..16).map(|i| (i as f32 * 0.3).cos()).collect();
        let raw = DistanceMetric::Cosine.distance(&a, &b);
        let stored = Quantization::Scalar.encode(&b);
        let approx = stored.distance_to_query(DistanceMetric::Cosine, &a);
        assert!((raw - approx).abs() < 0.05, "{raw} vs {approx}");
    }
}
