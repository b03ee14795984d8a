//! Application state shared by handlers

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::domain::ModelRegistry;
use crate::infrastructure::services::{RequestRouter, SemanticCache};

/// Cloned into every handler; all members are reference counted
#[derive(Debug, Clone)]
pub struct AppState {
    pub router: Arc<RequestRouter>,
    admin_key_hash: Option<Arc<str>>,
}

impl AppState {
    pub fn new(router: Arc<RequestRouter>) -> Self {
        Self {
            router,
            admin_key_hash: None,
        }
    }

    /// Enable the admin API, gated by `key`. Only the digest is kept.
    pub fn with_admin_key(mut self, key: &str) -> Self {
        self.admin_key_hash = Some(hash_admin_key(key).into());
        self
    }

    pub fn admin_key_hash(&self) -> Option<&str> {
        self.admin_key_hash.as_deref()
    }

    pub fn registry(&self) -> &ModelRegistry {
        self.router.registry()
    }

    pub fn cache(&self) -> Option<&Arc<SemanticCache>> {
        self.router.cache()
    }
}

/// Hex SHA-256 digest of an admin key
pub fn hash_admin_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}
