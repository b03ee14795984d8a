//! Infrastructure services

mod request_router;
mod semantic_cache;

pub use request_router::{
    Completion, RequestRouter, ResponseStream, RoutePreview, RoutedResponse, RouterConfig,
    RouterTimeouts,
};
pub use semantic_cache::{CacheHit, SemanticCache};
