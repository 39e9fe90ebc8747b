//! Injection strategy registry.
//!
//! Every injector owns its own table. Lookups never fail: a name that does
//! not resolve yields the `hybrid` strategy.

use chatty_config::{ConfigError, InjectionConfig};
use chatty_core::strategy::{InjectionStrategy, StrategyKind};
use std::collections::BTreeMap;
use tracing::debug;

/// Name of the strategy used when a lookup misses.
pub const FALLBACK_STRATEGY: &str = "hybrid";

/// Read-only table of named strategies.
#[derive(Debug, Clone)]
pub struct StrategyTable {
    strategies: BTreeMap<String, InjectionStrategy>,
    fallback: InjectionStrategy,
    default_name: String,
}

impl StrategyTable {
    /// The five built-in strategies with their default parameters.
    pub fn new() -> Self {
        Self::from_strategies(
            StrategyKind::all().into_iter().map(InjectionStrategy::builtin),
            FALLBACK_STRATEGY,
        )
    }

    /// Build a table from explicit strategies. A `hybrid` entry among them
    /// replaces the built-in fallback; an unknown `default_name` falls back
    /// to `hybrid`.
    pub fn from_strategies(
        strategies: impl IntoIterator<Item = InjectionStrategy>,
        default_name: &str,
    ) -> Self {
        let strategies: BTreeMap<String, InjectionStrategy> = strategies
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();
        let fallback = strategies
            .get(FALLBACK_STRATEGY)
            .cloned()
            .unwrap_or_else(InjectionStrategy::fallback);
        let default_name = if strategies.contains_key(default_name) {
            default_name.to_string()
        } else {
            FALLBACK_STRATEGY.to_string()
        };
        Self {
            strategies,
            fallback,
            default_name,
        }
    }

    /// Built-ins with configured overrides and additional strategies.
    pub fn from_config(config: &InjectionConfig) -> Result<Self, ConfigError> {
        Ok(Self::from_strategies(
            config.strategies()?,
            &config.default_strategy,
        ))
    }

    /// Resolve a strategy by name, falling back to `hybrid`.
    pub fn resolve(&self, name: &str) -> &InjectionStrategy {
        match self.strategies.get(name) {
            Some(strategy) => strategy,
            None => {
                debug!(requested = name, "Unknown injection strategy, using hybrid");
                &self.fallback
            }
        }
    }

    /// The configured default strategy.
    pub fn default_strategy(&self) -> &InjectionStrategy {
        self.resolve(&self.default_name)
    }

    pub fn get(&self, name: &str) -> Option<&InjectionStrategy> {
        self.strategies.get(name)
    }

    /// All strategies, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &InjectionStrategy> {
        self.strategies.values()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::new()
    }
}
