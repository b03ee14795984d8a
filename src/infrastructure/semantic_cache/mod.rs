//! Semantic store implementations

mod factory;
mod in_memory;
mod redis_store;

pub use factory::create_semantic_store;
pub use in_memory::InMemorySemanticStore;
pub use redis_store::RedisSemanticStore;
