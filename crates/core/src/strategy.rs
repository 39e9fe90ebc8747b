//! Injection strategy types.
//!
//! A strategy is a named, parameterized policy for selecting and ranking
//! memories to include in a prompt. The five built-in kinds carry fixed
//! default parameters; configuration may override them.

use serde::{Deserialize, Serialize};

/// The ranking policy a strategy applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Sort by relevance
    RelevanceBased,
    /// Sort by importance
    ImportanceBased,
    /// Sort by the mean of relevance and importance
    Hybrid,
    /// Boost relevance, then sort by topic/intent/history match
    Contextual,
    /// Boost by conversation length, then sort by recency and usage
    Adaptive,
}

impl StrategyKind {
    /// All built-in kinds in table order.
    pub const fn all() -> [StrategyKind; 5] {
        [
            Self::RelevanceBased,
            Self::ImportanceBased,
            Self::Hybrid,
            Self::Contextual,
            Self::Adaptive,
        ]
    }

    /// The registry name of the built-in strategy of this kind.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RelevanceBased => "relevance_based",
            Self::ImportanceBased => "importance_based",
            Self::Hybrid => "hybrid",
            Self::Contextual => "contextual",
            Self::Adaptive => "adaptive",
        }
    }

    /// Look up a built-in kind by registry name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|k| k.name() == name)
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the prompt builder should splice the injected text.
///
/// Recorded for the prompt builder only; the injector always returns
/// memories in ranked order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionPosition {
    #[default]
    Prepend,
    Append,
    Interleave,
}

impl std::fmt::Display for InjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prepend => write!(f, "prepend"),
            Self::Append => write!(f, "append"),
            Self::Interleave => write!(f, "interleave"),
        }
    }
}

/// Tunable parameters of a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParameters {
    pub relevance_threshold: f32,
    pub importance_threshold: f32,
    pub max_memories_per_injection: usize,
    /// Share of the caller's token budget held back, `[0, 1]`
    pub token_reservation: f32,
    pub injection_position: InjectionPosition,
    pub semantic_boost: f32,
}

impl StrategyParameters {
    /// Tokens left for memories out of `max_tokens`, never negative.
    pub fn available_tokens(&self, max_tokens: u32) -> u32 {
        // f32 reservations such as 0.2 are inexact; snap the share to
        // six decimals so 200 × 0.8 floors to 160, not 159.
        let share = ((1.0 - f64::from(self.token_reservation)) * 1e6).round() / 1e6;
        let share = share.clamp(0.0, 1.0);
        (f64::from(max_tokens) * share + 1e-9).floor() as u32
    }
}

/// A named injection strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionStrategy {
    pub name: String,
    pub kind: StrategyKind,
    pub parameters: StrategyParameters,
}

impl InjectionStrategy {
    /// The built-in strategy of the given kind, with its default parameters.
    pub fn builtin(kind: StrategyKind) -> Self {
        let (relevance, importance, max, reservation, position, boost) = match kind {
            StrategyKind::RelevanceBased => (0.6, 0.3, 10, 0.20, InjectionPosition::Prepend, 0.3),
            StrategyKind::ImportanceBased => (0.4, 0.7, 8, 0.15, InjectionPosition::Prepend, 0.2),
            StrategyKind::Hybrid => (0.5, 0.5, 12, 0.25, InjectionPosition::Prepend, 0.25),
            StrategyKind::Contextual => (0.7, 0.4, 15, 0.30, InjectionPosition::Interleave, 0.4),
            StrategyKind::Adaptive => (0.5, 0.5, 10, 0.20, InjectionPosition::Prepend, 0.3),
        };
        Self {
            name: kind.name().to_string(),
            kind,
            parameters: StrategyParameters {
                relevance_threshold: relevance,
                importance_threshold: importance,
                max_memories_per_injection: max,
                token_reservation: reservation,
                injection_position: position,
                semantic_boost: boost,
            },
        }
    }

    /// The default strategy used whenever a name does not resolve.
    pub fn fallback() -> Self {
        Self::builtin(StrategyKind::Hybrid)
    }
}
