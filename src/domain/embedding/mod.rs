//! Embedding provider seam and vector similarity

mod provider;
mod similarity;

pub use provider::EmbeddingProvider;
pub use similarity::{cosine_similarity, embedding_fingerprint};

#[cfg(test)]
pub use provider::mock::MockEmbeddingProvider;
