use std::collections::HashSet;
use std::sync::Arc;

use super::ComplexityTier;
use crate::domain::llm::ModelAdapter;
use crate::domain::DomainError;

/// Immutable set of backend models available to the router
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    adapters: Vec<Arc<dyn ModelAdapter>>,
}

impl ModelRegistry {
    /// Build a registry, rejecting invalid profiles and duplicate identifiers
    pub fn new(adapters: Vec<Arc<dyn ModelAdapter>>) -> Result<Self, DomainError> {
        let mut seen = HashSet::new();

        for adapter in &adapters {
            adapter.profile().validate()?;

            let id = adapter.id();
            if !seen.insert(id.clone()) {
                return Err(DomainError::configuration(format!(
                    "Model '{}' is registered more than once",
                    id
                )));
            }
        }

        Ok(Self { adapters })
    }

    pub fn adapters(&self) -> &[Arc<dyn ModelAdapter>] {
        &self.adapters
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ModelAdapter>> {
        self.adapters.iter().find(|a| a.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Tiers that no registered model may serve
    pub fn uncovered_tiers(&self) -> Vec<ComplexityTier> {
        ComplexityTier::ALL
            .into_iter()
            .filter(|tier| !self.adapters.iter().any(|a| a.profile().can_serve(*tier)))
            .collect()
    }
}
