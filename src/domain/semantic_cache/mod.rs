//! Semantic cache domain models and traits
//!
//! Matches semantically similar queries by embedding similarity instead of
//! requiring exact key matches.

mod config;
mod entry;
mod store;

pub use config::{CacheBackend, SemanticCacheConfig};
pub use entry::{CachedEntry, SemanticCacheStats, SemanticSearchResult};
pub use store::SemanticStore;

#[cfg(test)]
pub use store::MockSemanticStore;
