//! Ledger semantics shared by every storing backend.
//!
//! `LedgerState` is the plain, synchronous record of memories, hooks and
//! rituals. Backends wrap it in a lock and decide what happens to it after
//! a mutation (nothing for the in-memory ledger, a file rewrite for the
//! file ledger).

use chatty_core::error::LedgerError;
use chatty_core::hook::{ContinuityHook, HookContext, NewHook, NewRitual, Ritual};
use chatty_core::memory::{
    MemoryEntry, MemoryMetadata, MemoryQuery, MemoryQueryResult, MemoryUpdate, NewMemory,
    clamp_score,
};
use chatty_core::token::estimate_tokens;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use uuid::Uuid;

/// Bonus added to a candidate whose content or tags mention the topic.
const TOPIC_MATCH_BONUS: f32 = 0.2;
/// Bonus added to a candidate whose content or tags mention the intent.
const INTENT_MATCH_BONUS: f32 = 0.1;

/// In-process ledger contents.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    pub memories: Vec<MemoryEntry>,
    pub hooks: Vec<ContinuityHook>,
    pub rituals: Vec<Ritual>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter, rank, and token-truncate memories.
    ///
    /// Candidates are ranked by `(relevance + importance) / 2` plus topic
    /// and intent match bonuses; ties go to the newer memory, then the
    /// lower id. Truncation is greedy: a memory that would overflow the
    /// token ceiling is skipped and scanning continues.
    pub fn query(&self, query: &MemoryQuery) -> MemoryQueryResult {
        let topic = non_empty_lower(query.topic.as_deref());
        let intent = non_empty_lower(query.user_intent.as_deref());

        let mut ranked: Vec<(f32, &MemoryEntry)> = self
            .memories
            .iter()
            .filter(|m| matches_filters(m, query))
            .map(|m| {
                let mut score = (m.relevance() + m.importance()) / 2.0;
                if topic.as_deref().is_some_and(|t| mentions(m, t)) {
                    score += TOPIC_MATCH_BONUS;
                }
                if intent.as_deref().is_some_and(|i| mentions(m, i)) {
                    score += INTENT_MATCH_BONUS;
                }
                (score, m)
            })
            .collect();

        ranked.sort_by(|(sa, a), (sb, b)| {
            sb.partial_cmp(sa)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
                .then_with(|| a.id.cmp(&b.id))
        });

        let limit = query.limit.unwrap_or(usize::MAX);
        let budget = query.max_tokens.map(u64::from);
        let mut used: u64 = 0;
        let mut selected = Vec::new();

        for (_, memory) in ranked {
            if selected.len() >= limit {
                break;
            }
            let cost = u64::from(memory.token_count());
            if let Some(budget) = budget {
                if used + cost > budget {
                    continue;
                }
            }
            used += cost;
            selected.push(memory.clone());
        }

        MemoryQueryResult::from_memories(selected)
    }

    pub fn get_memory(&self, id: &str) -> Option<&MemoryEntry> {
        self.memories.iter().find(|m| m.id == id)
    }

    pub fn create_memory(&mut self, draft: NewMemory, now: DateTime<Utc>) -> MemoryEntry {
        let token_count = draft
            .token_count
            .unwrap_or_else(|| estimate_tokens(&draft.content));
        let entry = MemoryEntry {
            id: Uuid::new_v4().to_string(),
            user_id: draft.user_id,
            session_id: draft.session_id,
            kind: draft.kind,
            category: draft.category,
            content: draft.content,
            timestamp: now,
            metadata: MemoryMetadata {
                importance: clamp_score(draft.importance),
                relevance: clamp_score(draft.relevance),
                token_count,
                access_count: 0,
                tags: draft.tags,
                last_accessed: None,
                detail: draft.detail,
            },
        };
        self.memories.push(entry.clone());
        entry
    }

    pub fn update_memory(&mut self, id: &str, update: MemoryUpdate) -> Result<(), LedgerError> {
        let entry = self
            .memories
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| LedgerError::NotFound(format!("memory {id}")))?;

        let meta = &mut entry.metadata;
        if let Some(relevance) = update.relevance {
            meta.relevance = clamp_score(relevance);
        }
        if let Some(importance) = update.importance {
            meta.importance = clamp_score(importance);
        }
        if let Some(tags) = update.tags {
            meta.tags = tags;
        }
        if let Some(count) = update.access_count {
            meta.access_count = count;
        }
        if let Some(at) = update.last_accessed {
            meta.last_accessed = Some(at);
        }
        Ok(())
    }

    /// Bump access bookkeeping of every listed memory. Unknown ids are
    /// skipped; returns how many memories were touched.
    pub fn touch_memories(&mut self, ids: &[String], at: DateTime<Utc>) -> usize {
        let mut touched = 0;
        for memory in self.memories.iter_mut().filter(|m| ids.contains(&m.id)) {
            memory.metadata.access_count = memory.metadata.access_count.saturating_add(1);
            memory.metadata.last_accessed = Some(at);
            touched += 1;
        }
        touched
    }

    /// Hooks of `user_id` whose trigger fires for `ctx`, highest priority
    /// first. Each returned hook has its trigger bookkeeping bumped.
    pub fn check_hooks(&mut self, user_id: &str, ctx: &HookContext) -> Vec<ContinuityHook> {
        let mut fired = Vec::new();
        for hook in self
            .hooks
            .iter_mut()
            .filter(|h| h.user_id == user_id && h.trigger.matches(ctx))
        {
            hook.trigger_count += 1;
            hook.last_triggered = Some(ctx.current_time);
            fired.push(hook.clone());
        }
        // Stable: equal priorities keep creation order
        fired.sort_by(|a, b| b.priority.cmp(&a.priority));
        fired
    }

    pub fn create_hook(&mut self, draft: NewHook, now: DateTime<Utc>) -> ContinuityHook {
        let hook = ContinuityHook {
            id: Uuid::new_v4().to_string(),
            user_id: draft.user_id,
            trigger: draft.trigger,
            action: draft.action,
            priority: draft.priority,
            created_at: now,
            last_triggered: None,
            trigger_count: 0,
        };
        self.hooks.push(hook.clone());
        hook
    }

    pub fn create_ritual(&mut self, draft: NewRitual) -> Ritual {
        let ritual = Ritual {
            id: Uuid::new_v4().to_string(),
            user_id: draft.user_id,
            name: draft.name,
            description: draft.description,
            frequency: draft.frequency,
            last_executed: None,
            execution_count: 0,
        };
        self.rituals.push(ritual.clone());
        ritual
    }

    /// Run every due ritual of `user_id` at `now`.
    pub fn execute_rituals(&mut self, user_id: &str, now: DateTime<Utc>) -> Vec<Ritual> {
        let mut executed = Vec::new();
        for ritual in self
            .rituals
            .iter_mut()
            .filter(|r| r.user_id == user_id && r.is_due(now))
        {
            ritual.last_executed = Some(now);
            ritual.execution_count += 1;
            executed.push(ritual.clone());
        }
        executed
    }
}

fn matches_filters(memory: &MemoryEntry, query: &MemoryQuery) -> bool {
    if query.user_id.as_ref().is_some_and(|u| *u != memory.user_id) {
        return false;
    }
    if query
        .session_id
        .as_ref()
        .is_some_and(|s| *s != memory.session_id)
    {
        return false;
    }
    if !query.kinds.is_empty() && !query.kinds.contains(&memory.kind) {
        return false;
    }
    if !query.categories.is_empty() && !query.categories.contains(&memory.category) {
        return false;
    }
    query.tags.is_empty() || query.tags.iter().any(|t| memory.metadata.tags.contains(t))
}

fn non_empty_lower(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Whether the memory's content or tags mention `needle` (already lowercase).
fn mentions(memory: &MemoryEntry, needle: &str) -> bool {
    memory.content.to_lowercase().contains(needle)
        || memory
            .metadata
            .tags
            .iter()
            .any(|t| t.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatty_core::hook::{HookAction, HookTrigger, RitualFrequency};
    use chatty_core::memory::{MemoryDetail, MemoryKind};
    use chrono::Duration;

    fn draft(user: &str, content: &str, relevance: f32, importance: f32, tokens: u32) -> NewMemory {
        NewMemory {
            user_id: user.into(),
            session_id: "s1".into(),
            kind: MemoryKind::Fact,
            category: "fact".into(),
            content: content.into(),
            importance,
            relevance,
            token_count: Some(tokens),
            tags: vec![],
            detail: MemoryDetail::General,
        }
    }

    #[test]
    fn create_estimates_tokens_and_clamps_scores() {
        let mut state = LedgerState::new();
        let mut d = draft("u1", "twelve chars", 1.7, -0.3, 0);
        d.token_count = None;
        let entry = state.create_memory(d, Utc::now());
        assert_eq!(entry.token_count(), 3);
        assert_eq!(entry.relevance(), 1.0);
        assert_eq!(entry.importance(), 0.0);
        assert!(!entry.id.is_empty());
    }

    #[test]
    fn query_filters_by_user_and_ranks() {
        let mut state = LedgerState::new();
        let now = Utc::now();
        state.create_memory(draft("u1", "low", 0.2, 0.2, 10), now);
        state.create_memory(draft("u1", "high", 0.9, 0.9, 10), now);
        state.create_memory(draft("u2", "other user", 1.0, 1.0, 10), now);

        let result = state.query(&MemoryQuery {
            user_id: Some("u1".into()),
            ..Default::default()
        });
        let contents: Vec<_> = result.memories.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["high", "low"]);
        assert_eq!(result.total_tokens, 20);
    }

    #[test]
    fn topic_match_outranks_slightly_better_scores() {
        let mut state = LedgerState::new();
        let now = Utc::now();
        state.create_memory(draft("u1", "We talked about the weather", 0.7, 0.7, 10), now);
        state.create_memory(draft("u1", "Alice plants tomatoes in her garden", 0.6, 0.6, 10), now);

        let result = state.query(&MemoryQuery {
            user_id: Some("u1".into()),
            topic: Some("Garden".into()),
            ..Default::default()
        });
        assert!(result.memories[0].content.contains("garden"));
        assert_eq!(result.memories.len(), 2);
    }

    #[test]
    fn token_truncation_skips_oversized_and_continues() {
        let mut state = LedgerState::new();
        let now = Utc::now();
        state.create_memory(draft("u1", "a", 0.9, 0.9, 60), now);
        state.create_memory(draft("u1", "b", 0.8, 0.8, 80), now);
        state.create_memory(draft("u1", "c", 0.7, 0.7, 30), now);

        let result = state.query(&MemoryQuery {
            max_tokens: Some(100),
            ..Default::default()
        });
        let contents: Vec<_> = result.memories.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "c"]);
        assert_eq!(result.total_tokens, 90);

        let none = state.query(&MemoryQuery {
            max_tokens: Some(0),
            ..Default::default()
        });
        assert!(none.memories.is_empty());
        assert_eq!(none.relevance_score, 0.0);
    }

    #[test]
    fn ties_prefer_newer_memories() {
        let mut state = LedgerState::new();
        let now = Utc::now();
        state.create_memory(draft("u1", "older", 0.5, 0.5, 5), now - Duration::days(2));
        state.create_memory(draft("u1", "newer", 0.5, 0.5, 5), now);

        let result = state.query(&MemoryQuery::default());
        assert_eq!(result.memories[0].content, "newer");
    }

    #[test]
    fn update_unknown_memory_is_not_found() {
        let mut state = LedgerState::new();
        let err = state
            .update_memory("missing", MemoryUpdate::relevance(0.4))
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[test]
    fn update_clamps_relevance() {
        let mut state = LedgerState::new();
        let entry = state.create_memory(draft("u1", "x", 0.5, 0.5, 1), Utc::now());
        state
            .update_memory(&entry.id, MemoryUpdate::relevance(1.2))
            .unwrap();
        assert_eq!(state.get_memory(&entry.id).unwrap().relevance(), 1.0);
    }

    #[test]
    fn touch_bumps_listed_memories_only() {
        let mut state = LedgerState::new();
        let now = Utc::now();
        let a = state.create_memory(draft("u1", "a", 0.5, 0.5, 1), now);
        let b = state.create_memory(draft("u1", "b", 0.5, 0.5, 1), now);

        let touched = state.touch_memories(&[a.id.clone(), "gone".into()], now);
        assert_eq!(touched, 1);
        state.touch_memories(&[a.id.clone()], now);

        let a = state.get_memory(&a.id).unwrap();
        assert_eq!(a.metadata.access_count, 2);
        assert_eq!(a.metadata.last_accessed, Some(now));
        let b = state.get_memory(&b.id).unwrap();
        assert_eq!(b.metadata.access_count, 0);
        assert!(b.metadata.last_accessed.is_none());
    }

    #[test]
    fn hooks_fire_by_priority_and_track_counts() {
        let mut state = LedgerState::new();
        let now = Utc::now();
        let greet = |text: &str| HookAction::Message { text: text.into() };
        state.create_hook(
            NewHook {
                user_id: "u1".into(),
                trigger: HookTrigger::SessionStart,
                action: greet("low"),
                priority: 1,
            },
            now,
        );
        state.create_hook(
            NewHook {
                user_id: "u1".into(),
                trigger: HookTrigger::SessionStart,
                action: greet("high"),
                priority: 5,
            },
            now,
        );
        state.create_hook(
            NewHook {
                user_id: "u2".into(),
                trigger: HookTrigger::SessionStart,
                action: greet("someone else"),
                priority: 9,
            },
            now,
        );

        let fired = state.check_hooks("u1", &HookContext::session_start("s1", now));
        assert_eq!(fired.len(), 2);
        assert_eq!(fired[0].action, greet("high"));
        assert!(fired.iter().all(|h| h.trigger_count == 1));
    }

    #[test]
    fn start_check_leaves_turn_hooks_untouched() {
        let mut state = LedgerState::new();
        let now = Utc::now();
        state.create_hook(
            NewHook {
                user_id: "u1".into(),
                trigger: HookTrigger::TimeWindow {
                    start_hour: 0,
                    end_hour: 0,
                },
                action: HookAction::Message {
                    text: "any time".into(),
                },
                priority: 0,
            },
            now,
        );

        assert!(state
            .check_hooks("u1", &HookContext::session_start("s1", now))
            .is_empty());
        assert_eq!(state.hooks[0].trigger_count, 0);
        assert!(state.hooks[0].last_triggered.is_none());
    }

    #[test]
    fn rituals_run_once_per_interval() {
        let mut state = LedgerState::new();
        let now = Utc::now();
        state.create_ritual(NewRitual {
            user_id: "u1".into(),
            name: "daily reflection".into(),
            description: String::new(),
            frequency: RitualFrequency::Daily,
        });

        assert_eq!(state.execute_rituals("u1", now).len(), 1);
        assert!(state.execute_rituals("u1", now + Duration::hours(1)).is_empty());
        let later = state.execute_rituals("u1", now + Duration::hours(25));
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].execution_count, 2);
        assert!(state.execute_rituals("u2", now).is_empty());
    }
}
