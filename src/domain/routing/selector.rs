use std::cmp::Ordering;
use std::sync::Arc;

use super::{ComplexityTier, ModelProfile, ModelRegistry};
use crate::domain::llm::ModelAdapter;
use crate::domain::DomainError;

/// Orders the models eligible for a tier into a primary and its fallbacks.
///
/// A model is eligible when its `min_tier` is at or below the requested tier.
/// Candidates are ordered so the closest capability match comes first, then by
/// ascending cost, then by latency class, and finally by identifier so the
/// order is stable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelSelector;

impl ModelSelector {
    pub fn new() -> Self {
        Self
    }

    pub fn select(
        &self,
        tier: ComplexityTier,
        registry: &ModelRegistry,
    ) -> Result<Vec<Arc<dyn ModelAdapter>>, DomainError> {
        let mut candidates: Vec<Arc<dyn ModelAdapter>> = registry
            .adapters()
            .iter()
            .filter(|adapter| adapter.profile().can_serve(tier))
            .cloned()
            .collect();

        if candidates.is_empty() {
            return Err(DomainError::no_eligible_model(tier));
        }

        candidates.sort_by(|a, b| compare_profiles(a.profile(), b.profile()));

        Ok(candidates)
    }

    /// Like [`select`](Self::select), preferring models whose context window
    /// fits `token_count`. Falls back to the full candidate list when none fit.
    pub fn select_within_context(
        &self,
        tier: ComplexityTier,
        registry: &ModelRegistry,
        token_count: usize,
    ) -> Result<Vec<Arc<dyn ModelAdapter>>, DomainError> {
        let candidates = self.select(tier, registry)?;

        let (fitting, overflowing): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|adapter| adapter.profile().max_context_tokens >= token_count);

        if fitting.is_empty() {
            return Ok(overflowing);
        }

        Ok(fitting.into_iter().chain(overflowing).collect())
    }
}

fn compare_profiles(a: &ModelProfile, b: &ModelProfile) -> Ordering {
    b.min_tier
        .cmp(&a.min_tier)
        .then_with(|| a.cost.total_cmp(&b.cost))
        .then_with(|| a.latency_class.cmp(&b.latency_class))
        .then_with(|| a.id().cmp(&b.id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockModelAdapter;
    use crate::domain::routing::LatencyClass;

    fn adapter(profile: ModelProfile) -> Arc<dyn ModelAdapter> {
        Arc::new(MockModelAdapter::new(profile))
    }

    fn registry() -> ModelRegistry {
        ModelRegistry::new(vec![
            adapter(ModelProfile::new("openai", "gpt-4o", ComplexityTier::Complex).with_cost(10.0)),
            adapter(
                ModelProfile::new("openai", "gpt-4o-mini", ComplexityTier::Simple).with_cost(0.5),
            ),
            adapter(ModelProfile::new("local", "llama-8b", ComplexityTier::Simple).with_cost(0.1)),
            adapter(
                ModelProfile::new("openai", "o3", ComplexityTier::Reasoning)
                    .with_cost(40.0)
                    .with_latency_class(LatencyClass::Slow),
            ),
        ])
        .unwrap()
    }

    fn ids(candidates: &[Arc<dyn ModelAdapter>]) -> Vec<String> {
        candidates.iter().map(|c| c.id()).collect()
    }

    #[test]
    fn test_simple_tier_orders_by_cost() {
        let candidates = ModelSelector::new()
            .select(ComplexityTier::Simple, &registry())
            .unwrap();

        assert_eq!(ids(&candidates), vec!["local/llama-8b", "openai/gpt-4o-mini"]);
    }

    #[test]
    fn test_higher_tier_prefers_closest_capability() {
        let candidates = ModelSelector::new()
            .select(ComplexityTier::Reasoning, &registry())
            .unwrap();

        assert_eq!(
            ids(&candidates),
            vec![
                "openai/o3",
                "openai/gpt-4o",
                "local/llama-8b",
                "openai/gpt-4o-mini"
            ]
        );
    }

    #[test]
    fn test_every_candidate_is_eligible() {
        for tier in ComplexityTier::ALL {
            let candidates = ModelSelector::new().select(tier, &registry()).unwrap();
            assert!(candidates.iter().all(|c| c.profile().min_tier <= tier));
        }
    }

    #[test]
    fn test_cost_breaks_ties_within_same_min_tier() {
        let registry = ModelRegistry::new(vec![
            adapter(ModelProfile::new("a", "pricey", ComplexityTier::Moderate).with_cost(3.0)),
            adapter(ModelProfile::new("b", "cheap", ComplexityTier::Moderate).with_cost(1.0)),
            adapter(
                ModelProfile::new("c", "cheap-slow", ComplexityTier::Moderate)
                    .with_cost(1.0)
                    .with_latency_class(LatencyClass::Slow),
            ),
        ])
        .unwrap();

        let candidates = ModelSelector::new()
            .select(ComplexityTier::Moderate, &registry)
            .unwrap();

        assert_eq!(ids(&candidates), vec!["b/cheap", "c/cheap-slow", "a/pricey"]);
    }

    #[test]
    fn test_no_eligible_model() {
        let registry = ModelRegistry::new(vec![adapter(ModelProfile::new(
            "openai",
            "o3",
            ComplexityTier::Reasoning,
        ))])
        .unwrap();

        let result = ModelSelector::new().select(ComplexityTier::Simple, &registry);

        assert!(matches!(
            result,
            Err(DomainError::NoEligibleModel {
                tier: ComplexityTier::Simple
            })
        ));
    }

    #[test]
    fn test_select_within_context_prefers_fitting_models() {
        let registry = ModelRegistry::new(vec![
            adapter(
                ModelProfile::new("a", "small-window", ComplexityTier::Simple)
                    .with_cost(0.1)
                    .with_max_context_tokens(1000),
            ),
            adapter(
                ModelProfile::new("b", "large-window", ComplexityTier::Simple)
                    .with_cost(1.0)
                    .with_max_context_tokens(100_000),
            ),
        ])
        .unwrap();
        let selector = ModelSelector::new();

        let candidates = selector
            .select_within_context(ComplexityTier::Simple, &registry, 5000)
            .unwrap();
        assert_eq!(ids(&candidates), vec!["b/large-window", "a/small-window"]);

        let candidates = selector
            .select_within_context(ComplexityTier::Simple, &registry, 500_000)
            .unwrap();
        assert_eq!(ids(&candidates), vec!["a/small-window", "b/large-window"]);
    }
}
