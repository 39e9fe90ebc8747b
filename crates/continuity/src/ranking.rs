//! Strategy application: threshold filter, boost, sort and budget fit.

use chatty_core::memory::{MemoryEntry, clamp_score};
use chatty_core::strategy::{InjectionStrategy, StrategyKind};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::context::InjectionContext;
use crate::scoring::RelevanceScorer;

/// Relevance boost earned per history message under `adaptive`.
const HISTORY_BOOST_STEP: f32 = 0.01;
/// Upper bound on the `adaptive` history boost.
const HISTORY_BOOST_CAP: f32 = 0.2;

/// Scorers consulted by the composite strategies.
pub struct Scorers<'a> {
    pub contextual: &'a dyn RelevanceScorer,
    pub adaptive: &'a dyn RelevanceScorer,
}

/// Filter and order `candidates` according to `strategy`.
///
/// The threshold filter runs on the scores the ledger reported. Boosted
/// relevance is clamped to `[0, 1]` and can only raise a score, so every
/// survivor still satisfies both thresholds afterwards. Sorting is stable:
/// equal keys keep the ledger's order.
pub fn apply_strategy(
    candidates: Vec<MemoryEntry>,
    strategy: &InjectionStrategy,
    ctx: &InjectionContext,
    scorers: &Scorers<'_>,
    now: DateTime<Utc>,
) -> Vec<MemoryEntry> {
    let params = &strategy.parameters;
    let mut ranked: Vec<MemoryEntry> = candidates
        .into_iter()
        .filter(|m| {
            m.relevance() >= params.relevance_threshold
                && m.importance() >= params.importance_threshold
        })
        .collect();

    match strategy.kind {
        StrategyKind::RelevanceBased => sort_desc_by(&mut ranked, |m| m.relevance()),
        StrategyKind::ImportanceBased => sort_desc_by(&mut ranked, |m| m.importance()),
        StrategyKind::Hybrid => {
            sort_desc_by(&mut ranked, |m| (m.relevance() + m.importance()) / 2.0)
        }
        StrategyKind::Contextual => {
            boost_relevance(&mut ranked, params.semantic_boost);
            sort_desc_by(&mut ranked, |m| scorers.contextual.score(m, ctx, now));
        }
        StrategyKind::Adaptive => {
            let boost = (ctx.conversation_history.len() as f32 * HISTORY_BOOST_STEP)
                .min(HISTORY_BOOST_CAP);
            boost_relevance(&mut ranked, boost);
            sort_desc_by(&mut ranked, |m| scorers.adaptive.score(m, ctx, now));
        }
    }

    ranked
}

/// Greedy selection in ranked order: a memory that would overflow
/// `available_tokens` is skipped and scanning continues, then the list is
/// cut to `max_memories`.
pub fn select_within_budget(
    ranked: Vec<MemoryEntry>,
    available_tokens: u32,
    max_memories: usize,
) -> Vec<MemoryEntry> {
    let mut used: u32 = 0;
    let mut selected = Vec::new();
    for memory in ranked {
        if selected.len() >= max_memories {
            break;
        }
        match used.checked_add(memory.token_count()) {
            Some(total) if total <= available_tokens => {
                used = total;
                selected.push(memory);
            }
            _ => {}
        }
    }
    selected
}

fn boost_relevance(memories: &mut [MemoryEntry], boost: f32) {
    for memory in memories {
        memory.metadata.relevance = clamp_score(memory.metadata.relevance + boost);
    }
}

fn sort_desc_by<F>(memories: &mut Vec<MemoryEntry>, key: F)
where
    F: Fn(&MemoryEntry) -> f32,
{
    let mut keyed: Vec<(f32, MemoryEntry)> = memories.drain(..).map(|m| (key(&m), m)).collect();
    keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    memories.extend(keyed.into_iter().map(|(_, m)| m));
}
