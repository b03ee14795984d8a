//! Domain layer - Core routing logic, entities and seams

pub mod embedding;
pub mod error;
pub mod llm;
pub mod routing;
pub mod semantic_cache;

pub use embedding::{cosine_similarity, EmbeddingProvider};
pub use error::DomainError;
pub use llm::{
    FinishReason, LlmRequest, LlmRequestBuilder, LlmStream, Message, MessageRole, ModelAdapter,
    StreamChunk, Usage,
};
pub use routing::{
    CacheStatus, ClassifierConfig, ComplexityClassifier, ComplexityTier, FeatureExtractor,
    Features, LatencyClass, ModelProfile, ModelRegistry, ModelSelector, RouteDecision,
    TokenCounter,
};
pub use semantic_cache::{
    CacheBackend, CachedEntry, SemanticCacheConfig, SemanticCacheStats, SemanticSearchResult,
    SemanticStore,
};
