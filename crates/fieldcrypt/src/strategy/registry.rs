//! [`StrategyRegistry`]: container shape to strategy lookup.
//!
//! Built once at startup and shared by reference; registering a strategy for
//! a new shape is the single extension point for container support.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use super::{ArrayStrategy, ContainerStrategy, ListStrategy, MapStrategy, QueueStrategy, SetStrategy};
use crate::value::ContainerShape;

/// Lookup table of container strategies keyed by shape.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<ContainerShape, Arc<dyn ContainerStrategy>>,
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the five built-in strategies.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ListStrategy));
        registry.register(Arc::new(SetStrategy));
        registry.register(Arc::new(MapStrategy));
        registry.register(Arc::new(QueueStrategy));
        registry.register(Arc::new(ArrayStrategy));
        info!(strategies = registry.len(), "container strategies registered");
        registry
    }

    /// Register `strategy` for its shape, returning the one it replaces.
    pub fn register(&mut self, strategy: Arc<dyn ContainerStrategy>) -> Option<Arc<dyn ContainerStrategy>> {
        self.strategies.insert(strategy.shape(), strategy)
    }

    /// Remove the strategy for `shape`.
    pub fn unregister(&mut self, shape: ContainerShape) -> Option<Arc<dyn ContainerStrategy>> {
        self.strategies.remove(&shape)
    }

    pub fn get(&self, shape: ContainerShape) -> Option<&Arc<dyn ContainerStrategy>> {
        self.strategies.get(&shape)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.strategies.values().map(|s| s.name()).collect();
        names.sort_unstable();
        f.debug_struct("StrategyRegistry").field("strategies", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_container_shape() {
        let registry = StrategyRegistry::with_defaults();
        assert_eq!(registry.len(), 5);
        for shape in ContainerShape::CONTAINERS {
            let strategy = registry.get(shape).unwrap();
            assert_eq!(strategy.shape(), shape);
        }
        assert!(registry.get(ContainerShape::Scalar).is_none());
    }

    #[test]
    fn register_replaces_existing() {
        let mut registry = StrategyRegistry::with_defaults();
        let previous = registry.register(Arc::new(ListStrategy));
        assert!(previous.is_some());
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn unregister_removes_shape() {
        let mut registry = StrategyRegistry::with_defaults();
        registry.unregister(ContainerShape::Map);
        assert!(registry.get(ContainerShape::Map).is_none());
        assert_eq!(registry.len(), 4);
        assert!(StrategyRegistry::new().is_empty());
    }

    #[test]
    fn debug_lists_strategy_names() {
        let dbg = format!("{:?}", StrategyRegistry::with_defaults());
        assert!(dbg.contains("list") && dbg.contains("queue"), "{dbg}");
    }
}
