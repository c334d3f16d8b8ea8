//! Embedding Collaborators
//!
//! Embeddings arrive from an external provider as opaque f32 vectors; the
//! engine never trains or hosts a model. This module defines the provider
//! trait and the little-endian byte codec used for the database blob
//! column.

use async_trait::async_trait;

/// External capability that turns text into a dense vector.
///
/// Returning `None` signals "no embedding available" and the caller falls
/// back to the non-semantic path.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text. `None` when the provider declines.
    async fn embed(&self, text: &str) -> Option<Vec<f32>>;

    /// Dimensionality of produced vectors.
    fn dimensions(&self) -> usize;
}

/// Encode a vector as a little-endian f32 byte blob.
pub fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a little-endian f32 byte blob. `None` when the length is not a
/// multiple of four.
pub fn vector_from_bytes(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    let mut vector = Vec::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        vector.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Some(vector)
}
