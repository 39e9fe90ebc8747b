//! Pluggable composite scorers used by the `contextual` and `adaptive`
//! strategies.
//!
//! Ranking and truncation only see the number a scorer returns, so a scorer
//! backed by real embedding similarity can replace the substring heuristics
//! without touching the rest of the pipeline.

use chatty_core::memory::MemoryEntry;
use chrono::{DateTime, Utc};

use crate::context::InjectionContext;

/// Scores one candidate memory against the current turn. Higher is better.
pub trait RelevanceScorer: Send + Sync {
    fn name(&self) -> &str;

    fn score(&self, memory: &MemoryEntry, ctx: &InjectionContext, now: DateTime<Utc>) -> f32;
}

const TOPIC_WEIGHT: f32 = 0.4;
const INTENT_WEIGHT: f32 = 0.3;
const HISTORY_WEIGHT: f32 = 0.2;
const RELEVANCE_WEIGHT: f32 = 0.1;

/// Case-insensitive substring matching on topic, intent and history.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringScorer;

impl SubstringScorer {
    fn history_matches(content: &str, history: &[String]) -> bool {
        history.iter().any(|message| {
            let message = message.trim().to_lowercase();
            !message.is_empty() && (content.contains(&message) || message.contains(content))
        })
    }
}

impl RelevanceScorer for SubstringScorer {
    fn name(&self) -> &str {
        "substring"
    }

    fn score(&self, memory: &MemoryEntry, ctx: &InjectionContext, _now: DateTime<Utc>) -> f32 {
        let content = memory.content.to_lowercase();
        let contains = |needle: &Option<String>| {
            needle
                .as_deref()
                .map(|n| n.trim().to_lowercase())
                .is_some_and(|n| !n.is_empty() && content.contains(&n))
        };

        let mut score = 0.0;
        if contains(&ctx.topic) {
            score += TOPIC_WEIGHT;
        }
        if contains(&ctx.user_intent) {
            score += INTENT_WEIGHT;
        }
        if Self::history_matches(&content, &ctx.conversation_history) {
            score += HISTORY_WEIGHT;
        }
        score + memory.relevance() * RELEVANCE_WEIGHT
    }
}

/// Base quality plus exponential recency decay plus a capped usage bonus.
#[derive(Debug, Clone, Copy)]
pub struct RecencyUsageScorer {
    /// Age at which the recency term halves
    pub half_life_days: f64,
    /// Usage bonus earned per recorded access
    pub usage_step: f32,
    /// Upper bound on the usage bonus
    pub usage_cap: f32,
}

impl Default for RecencyUsageScorer {
    fn default() -> Self {
        Self {
            half_life_days: 7.0,
            usage_step: 0.01,
            usage_cap: 0.1,
        }
    }
}

impl RecencyUsageScorer {
    /// `0.5^(age / half_life)`; memories from the future count as fresh.
    pub fn recency(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
        if self.half_life_days <= 0.0 {
            return 0.0;
        }
        let age_days = (now - timestamp).num_seconds().max(0) as f64 / 86_400.0;
        0.5_f64.powf(age_days / self.half_life_days) as f32
    }

    pub fn usage(&self, access_count: u32) -> f32 {
        (access_count as f32 * self.usage_step).min(self.usage_cap)
    }
}

impl RelevanceScorer for RecencyUsageScorer {
    fn name(&self) -> &str {
        "recency_usage"
    }

    fn score(&self, memory: &MemoryEntry, _ctx: &InjectionContext, now: DateTime<Utc>) -> f32 {
        let base = (memory.relevance() + memory.importance()) / 2.0;
        base + self.recency(memory.timestamp, now) + self.usage(memory.metadata.access_count)
    }
}
