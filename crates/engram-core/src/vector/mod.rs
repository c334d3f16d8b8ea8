//! Vector Index Module
//!
//! Approximate nearest-neighbor search over entry embeddings:
//! - `DistanceMetric` - cosine, euclidean, dot, manhattan (smaller = closer)
//! - `Quantization` - optional compressed vector storage
//! - `HnswIndex` - hierarchical navigable small world graph

mod hnsw;
mod metric;
mod quantization;

pub use hnsw::{HnswConfig, HnswIndex, VectorIndexError, VectorIndexStats};
pub use metric::DistanceMetric;
pub use quantization::{Quantization, StoredVector};
