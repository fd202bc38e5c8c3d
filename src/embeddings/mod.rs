//! Embedding generation for tenders and company profiles
//!
//! Text composition is deterministic: the same entity state always produces
//! the same composed text, which keys the content-addressed cache. Vectors
//! are L2-normalized so cosine similarity reduces to a dot product.

pub mod backfill;
pub mod cache;
pub mod client;
pub mod generator;
pub mod text;

pub use cache::EmbeddingCache;
pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;
pub use generator::EmbeddingService;

/// Maximum characters accepted by the embedding upstream.
pub const MAX_EMBED_CHARS: usize = 32_768;

/// Maximum texts per upstream batch call.
pub const MAX_BATCH_SIZE: usize = 100;

/// Normalize a vector to unit length in place. Zero vectors stay zero.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity of two vectors, 0.0 on dimension mismatch or zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
