//! The continuity injector.
//!
//! Orchestrates the session lifecycle, hook checks, token-budgeted memory
//! selection and injection text assembly on top of a [`MemoryLedger`].
//!
//! ```text
//! start_session ──► inject_memories (per turn) ──► end_session
//!       │                  │                           │
//!   rituals +        hooks, query, rank,         summary memory,
//!   start hooks      fit budget, render          evict from registry
//! ```
//!
//! Ledger failures are never swallowed: they propagate to the caller,
//! which decides whether to continue without memory context.

use chatty_core::error::{LedgerError, Result};
use chatty_core::event::{ContinuityEvent, TelemetrySink};
use chatty_core::hook::{ContinuityHook, HookAction, HookContext, HookTrigger, NewHook};
use chatty_core::ledger::MemoryLedger;
use chatty_core::memory::{
    MemoryDetail, MemoryEntry, MemoryKind, MemoryQuery, MemoryUpdate, NewMemory,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::assembly::render_injection_context;
use crate::context::{InjectionContext, InjectionMetadata, InjectionResult};
use crate::feedback::RelevanceFeedback;
use crate::ranking::{Scorers, apply_strategy, select_within_budget};
use crate::scoring::{RecencyUsageScorer, RelevanceScorer, SubstringScorer};
use crate::session::{ContextSnapshot, ContinuitySession, SessionRegistry, SessionState};
use crate::strategy::StrategyTable;

/// Category of the memory written when a session ends.
pub const SESSION_SUMMARY_CATEGORY: &str = "session_summary";
const SUMMARY_IMPORTANCE: f32 = 0.8;
const SUMMARY_RELEVANCE: f32 = 0.9;

/// Optional settings for a new continuity hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct HookOptions {
    /// Higher fires first
    pub priority: i32,
}

/// Selects, ranks and budgets memories for each conversational turn.
///
/// Every injector owns its strategy table and session registry; nothing is
/// shared between instances.
pub struct ContinuityInjector {
    ledger: Arc<dyn MemoryLedger>,
    strategies: StrategyTable,
    contextual_scorer: Arc<dyn RelevanceScorer>,
    adaptive_scorer: Arc<dyn RelevanceScorer>,
    sessions: SessionRegistry,
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl ContinuityInjector {
    pub fn new(ledger: Arc<dyn MemoryLedger>) -> Self {
        Self {
            ledger,
            strategies: StrategyTable::new(),
            contextual_scorer: Arc::new(SubstringScorer),
            adaptive_scorer: Arc::new(RecencyUsageScorer::default()),
            sessions: SessionRegistry::new(),
            sink: None,
        }
    }

    pub fn with_strategies(mut self, strategies: StrategyTable) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Replace the composite scorer used by the `contextual` strategy.
    pub fn with_contextual_scorer(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.contextual_scorer = scorer;
        self
    }

    /// Replace the composite scorer used by the `adaptive` strategy.
    pub fn with_adaptive_scorer(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.adaptive_scorer = scorer;
        self
    }

    pub fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }

    /// Snapshot of a live session.
    pub async fn session(&self, session_id: &str) -> Option<ContinuitySession> {
        self.sessions.snapshot(session_id).await
    }

    /// Ids of all live sessions, sorted.
    pub async fn active_sessions(&self) -> Vec<String> {
        self.sessions.session_ids().await
    }

    /// Start a session: kick off the user's rituals in the background,
    /// fire `session_start` hooks and register the session.
    pub async fn start_session(&self, user_id: &str, session_id: &str) -> Result<ContinuitySession> {
        let now = Utc::now();

        let ledger = Arc::clone(&self.ledger);
        let ritual_user = user_id.to_string();
        tokio::spawn(async move {
            match ledger.execute_rituals(&ritual_user).await {
                Ok(rituals) if !rituals.is_empty() => {
                    debug!(user_id = %ritual_user, count = rituals.len(), "Session rituals executed");
                }
                Ok(_) => {}
                Err(e) => warn!(user_id = %ritual_user, error = %e, "Session rituals failed"),
            }
        });

        let hooks = self
            .ledger
            .check_continuity_hooks(user_id, &HookContext::session_start(session_id, now))
            .await?;

        let mut session = ContinuitySession::new(user_id, session_id, now);
        session.continuity_hooks = hooks.iter().map(|h| h.id.clone()).collect();
        self.sessions.insert(session.clone()).await;

        info!(
            user_id,
            session_id,
            hooks_triggered = hooks.len(),
            "Continuity session started"
        );
        self.emit(ContinuityEvent::SessionStarted {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            hooks_triggered: hooks.len(),
            timestamp: now,
        });

        Ok(session)
    }

    /// Select memories for one turn.
    ///
    /// `strategy_name` of `None` uses the table's default; an unknown name
    /// uses `hybrid`. The session's bookkeeping is recorded only after every
    /// ledger call succeeded, while holding the session lock for the whole
    /// turn. A session that is not registered still gets an injection.
    pub async fn inject_memories(
        &self,
        ctx: &InjectionContext,
        strategy_name: Option<&str>,
    ) -> Result<InjectionResult> {
        let started = Instant::now();
        let now = Utc::now();
        let strategy = match strategy_name {
            Some(name) => self.strategies.resolve(name),
            None => self.strategies.default_strategy(),
        }
        .clone();

        let handle = self.sessions.get(&ctx.session_id).await;
        let mut session = match &handle {
            Some(handle) => Some(handle.lock().await),
            None => None,
        };
        if session.as_ref().is_some_and(|s| !s.is_active()) {
            session = None;
        }
        if session.is_none() {
            debug!(session_id = %ctx.session_id, "Injecting without session bookkeeping");
        }

        let hook_ctx = HookContext {
            session_id: ctx.session_id.clone(),
            conversation_id: Some(ctx.conversation_id.clone()).filter(|c| !c.is_empty()),
            topic: ctx.topic.clone(),
            user_input: Some(ctx.current_message.clone()).filter(|m| !m.is_empty()),
            current_time: now,
            session_start: false,
        };
        let hooks = self
            .ledger
            .check_continuity_hooks(&ctx.user_id, &hook_ctx)
            .await?;

        let available_tokens = strategy.parameters.available_tokens(ctx.max_tokens);
        let base = self
            .ledger
            .query_memories(MemoryQuery {
                user_id: Some(ctx.user_id.clone()),
                topic: ctx.topic.clone(),
                user_intent: ctx.user_intent.clone(),
                max_tokens: Some(available_tokens),
                ..Default::default()
            })
            .await?;
        let memories_considered = base.memories.len();

        let scorers = Scorers {
            contextual: self.contextual_scorer.as_ref(),
            adaptive: self.adaptive_scorer.as_ref(),
        };
        let ranked = apply_strategy(base.memories, &strategy, ctx, &scorers, now);
        let injected = select_within_budget(
            ranked,
            available_tokens,
            strategy.parameters.max_memories_per_injection,
        );

        self.record_access(&injected, now).await?;

        let total_tokens: u32 = injected.iter().map(|m| m.token_count()).sum();
        let token_efficiency = if ctx.max_tokens == 0 {
            0.0
        } else {
            total_tokens as f32 / ctx.max_tokens as f32
        };
        let injection_context = render_injection_context(&hooks, &injected);

        if let Some(session) = session.as_mut() {
            session.record_turn(
                ContextSnapshot {
                    timestamp: now,
                    topic: ctx.topic.clone(),
                    intent: ctx.user_intent.clone(),
                    injected_tokens: total_tokens,
                },
                injected.iter().map(|m| m.id.clone()),
                hooks.iter().map(|h| h.id.clone()),
            );
        }
        drop(session);

        let injection_time_ms = started.elapsed().as_millis() as u64;
        info!(
            session_id = %ctx.session_id,
            strategy = %strategy.name,
            considered = memories_considered,
            injected = injected.len(),
            total_tokens,
            available_tokens,
            "Memories injected"
        );
        self.emit(ContinuityEvent::MemoriesInjected {
            session_id: ctx.session_id.clone(),
            strategy: strategy.name.clone(),
            memories_considered,
            memories_injected: injected.len(),
            total_tokens,
            relevance_score: base.relevance_score,
            duration_ms: injection_time_ms,
            timestamp: now,
        });

        Ok(InjectionResult {
            metadata: InjectionMetadata {
                memories_considered,
                memories_filtered: memories_considered - injected.len(),
                injection_time_ms,
                token_efficiency,
            },
            injected_memories: injected,
            total_tokens,
            relevance_score: base.relevance_score,
            injection_context,
            strategy,
            triggered_hooks: hooks,
        })
    }

    /// End a session: write its summary memory and evict it.
    ///
    /// Unknown or already ended sessions are a no-op returning `None`. If
    /// the summary write fails the session stays registered and active.
    pub async fn end_session(&self, session_id: &str) -> Result<Option<MemoryEntry>> {
        let Some(handle) = self.sessions.get(session_id).await else {
            debug!(session_id, "end_session for unknown session");
            return Ok(None);
        };

        let mut session = handle.lock().await;
        if !session.is_active() {
            return Ok(None);
        }

        let topics = session.topics();
        let summary = self
            .ledger
            .create_memory(NewMemory {
                user_id: session.user_id.clone(),
                session_id: session.session_id.clone(),
                kind: MemoryKind::Continuity,
                category: SESSION_SUMMARY_CATEGORY.to_string(),
                content: summary_content(&session, &topics),
                importance: SUMMARY_IMPORTANCE,
                relevance: SUMMARY_RELEVANCE,
                token_count: None,
                tags: vec![SESSION_SUMMARY_CATEGORY.to_string()],
                detail: MemoryDetail::SessionSummary {
                    interaction_count: session.interaction_count(),
                    injected_memory_count: session.injected_memories.len(),
                    hook_count: session.continuity_hooks.len(),
                    duration_secs: session.duration_secs(),
                    topics,
                },
            })
            .await?;

        session.state = SessionState::Ended;
        let user_id = session.user_id.clone();
        let interactions = session.interaction_count();
        drop(session);
        self.sessions.remove_if_same(session_id, &handle).await;

        info!(
            user_id = %user_id,
            session_id,
            interactions,
            summary_id = %summary.id,
            "Continuity session ended"
        );
        self.emit(ContinuityEvent::SessionEnded {
            user_id,
            session_id: session_id.to_string(),
            interactions,
            summary_memory_id: summary.id.clone(),
            timestamp: Utc::now(),
        });

        Ok(Some(summary))
    }

    /// Fold feedback into a memory's relevance and write it back.
    ///
    /// Returns the new relevance, or `None` when the memory does not exist.
    pub async fn update_memory_relevance(
        &self,
        memory_id: &str,
        feedback: RelevanceFeedback,
    ) -> Result<Option<f32>> {
        let Some(memory) = self.ledger.get_memory(memory_id).await? else {
            debug!(memory_id, "Relevance feedback for unknown memory");
            return Ok(None);
        };

        let previous = memory.relevance();
        let current = feedback.adjusted_relevance(previous);
        match self
            .ledger
            .update_memory(memory_id, MemoryUpdate::relevance(current))
            .await
        {
            Ok(()) => {}
            Err(LedgerError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        debug!(memory_id, previous, current, "Memory relevance updated");
        self.emit(ContinuityEvent::RelevanceUpdated {
            memory_id: memory_id.to_string(),
            previous,
            current,
            timestamp: Utc::now(),
        });
        Ok(Some(current))
    }

    /// Create a continuity hook through the ledger.
    pub async fn create_continuity_hook(
        &self,
        user_id: &str,
        trigger: HookTrigger,
        action: HookAction,
        options: HookOptions,
    ) -> Result<ContinuityHook> {
        let hook = self
            .ledger
            .create_continuity_hook(NewHook {
                user_id: user_id.to_string(),
                trigger,
                action,
                priority: options.priority,
            })
            .await?;

        debug!(user_id, hook_id = %hook.id, trigger = hook.trigger.kind(), "Continuity hook created");
        self.emit(ContinuityEvent::HookCreated {
            user_id: user_id.to_string(),
            hook_id: hook.id.clone(),
            trigger: hook.trigger.kind().to_string(),
            timestamp: hook.created_at,
        });
        Ok(hook)
    }

    /// Bump usage counters of injected memories in one ledger call.
    /// Memories deleted since the query are skipped by the ledger.
    async fn record_access(&self, memories: &[MemoryEntry], now: DateTime<Utc>) -> Result<()> {
        if memories.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = memories.iter().map(|m| m.id.clone()).collect();
        self.ledger.touch_memories(&ids, now).await?;
        Ok(())
    }

    fn emit(&self, event: ContinuityEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(event);
        }
    }
}

fn summary_content(session: &ContinuitySession, topics: &[String]) -> String {
    let mut content = format!(
        "Session {} with {} interactions, {} memories injected, {} hooks triggered.",
        session.session_id,
        session.interaction_count(),
        session.injected_memories.len(),
        session.continuity_hooks.len(),
    );
    if !topics.is_empty() {
        content.push_str(&format!(" Topics: {}.", topics.join(", ")));
    }
    content
}
