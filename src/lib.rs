//! LLM Tier Router
//!
//! An OpenAI-compatible front door that:
//! - Classifies each query into a complexity tier
//! - Sends it to the cheapest model able to serve that tier, falling back on failure
//! - Answers paraphrased repeats from a semantic cache

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use crate::config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use api::state::AppState;
use domain::{DomainError, FeatureExtractor};
use infrastructure::embedding::create_embedding_provider;
use infrastructure::llm::ModelAdapterFactory;
use infrastructure::semantic_cache::create_semantic_store;
use infrastructure::services::{RequestRouter, SemanticCache};
use infrastructure::tokenizer::UnicodeTokenCounter;

/// How often expired cache entries are swept
const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Build a router over the configured models, without the semantic cache.
///
/// Makes no network calls.
pub fn build_request_router(config: &AppConfig) -> Result<RequestRouter, DomainError> {
    config.validate()?;

    let registry = ModelAdapterFactory::build_registry(&config.models)?;
    let extractor = FeatureExtractor::new(Arc::new(UnicodeTokenCounter::new()));

    Ok(RequestRouter::new(
        extractor,
        Arc::new(registry),
        config.router.clone(),
    ))
}

/// Create the application state: router, cache and admin key
pub async fn build_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let mut router = build_request_router(config)?;

    if config.cache_active() {
        if let Some(ref embedding) = config.embedding {
            let embedder = create_embedding_provider(embedding)?;
            let store = create_semantic_store(&config.semantic_cache).await?;
            let cache = Arc::new(SemanticCache::new(store, config.semantic_cache.clone()));

            cache.spawn_purge_task(CACHE_PURGE_INTERVAL);
            router = router.with_cache(embedder, cache);

            info!(
                backend = ?config.semantic_cache.backend,
                model = %embedding.model,
                "Semantic cache enabled"
            );
        }
    } else if config.semantic_cache.enabled {
        warn!("Semantic cache enabled but no embedding endpoint configured, cache disabled");
    } else {
        info!("Semantic cache disabled");
    }

    let mut state = AppState::new(Arc::new(router));

    match std::env::var(&config.admin.api_key_env) {
        Ok(key) if !key.trim().is_empty() => {
            state = state.with_admin_key(key.trim());
            info!("Admin API enabled");
        }
        _ => {
            warn!(
                env = %config.admin.api_key_env,
                "Admin key not set, admin endpoints disabled"
            );
        }
    }

    Ok(state)
}
