//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::DomainError;

/// Produces a fixed-dimension vector for a piece of text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Model used for every embedding
    fn model(&self) -> &str;

    /// Expected vector length, when known up front
    fn dimensions(&self) -> Option<usize>;
}
