//! End-to-end tests for the Chatty continuity pipeline.
//!
//! These tests run whole conversations against a real file ledger: memories
//! are stored, sessions started, memories injected, feedback applied and
//! sessions summarized, then the ledger is reopened from disk.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chatty_config::{AppConfig, LedgerBackend};
use chatty_continuity::{
    ContinuityInjector, HookOptions, InjectionContext, RelevanceFeedback, SESSION_SUMMARY_CATEGORY,
    StrategyTable,
};
use chatty_core::error::{Error, LedgerError};
use chatty_core::event::EventBus;
use chatty_core::hook::{
    ContinuityHook, HookAction, HookContext, HookTrigger, NewHook, NewRitual, Ritual,
    RitualFrequency,
};
use chatty_core::ledger::MemoryLedger;
use chatty_core::memory::{
    MemoryDetail, MemoryEntry, MemoryKind, MemoryQuery, MemoryQueryResult, MemoryUpdate, NewMemory,
};
use chatty_memory::FileLedger;

// ── Helpers ──────────────────────────────────────────────────────────────

fn ledger_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("ledger.jsonl")
}

fn memory(user: &str, content: &str, relevance: f32, importance: f32, tags: &[&str]) -> NewMemory {
    NewMemory {
        user_id: user.into(),
        session_id: "earlier".into(),
        kind: MemoryKind::Preference,
        category: "preference".into(),
        content: content.into(),
        importance,
        relevance,
        token_count: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        detail: MemoryDetail::General,
    }
}

/// A ledger whose backing store is unreachable.
struct OfflineLedger;

#[async_trait]
impl MemoryLedger for OfflineLedger {
    fn name(&self) -> &str {
        "offline"
    }

    async fn query_memories(&self, _query: MemoryQuery) -> Result<MemoryQueryResult, LedgerError> {
        Err(LedgerError::Storage("connection refused".into()))
    }

    async fn get_memory(&self, _id: &str) -> Result<Option<MemoryEntry>, LedgerError> {
        Err(LedgerError::Storage("connection refused".into()))
    }

    async fn create_memory(&self, _memory: NewMemory) -> Result<MemoryEntry, LedgerError> {
        Err(LedgerError::Storage("connection refused".into()))
    }

    async fn update_memory(&self, _id: &str, _update: MemoryUpdate) -> Result<(), LedgerError> {
        Err(LedgerError::Storage("connection refused".into()))
    }

    async fn check_continuity_hooks(
        &self,
        _user_id: &str,
        _ctx: &HookContext,
    ) -> Result<Vec<ContinuityHook>, LedgerError> {
        Ok(vec![])
    }

    async fn create_continuity_hook(&self, _hook: NewHook) -> Result<ContinuityHook, LedgerError> {
        Err(LedgerError::Storage("connection refused".into()))
    }

    async fn create_ritual(&self, _ritual: NewRitual) -> Result<Ritual, LedgerError> {
        Err(LedgerError::Storage("connection refused".into()))
    }

    async fn execute_rituals(&self, _user_id: &str) -> Result<Vec<Ritual>, LedgerError> {
        Err(LedgerError::Storage("connection refused".into()))
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_full_session_persists_to_file_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = ledger_path(&dir);

    let ledger = Arc::new(FileLedger::new(path.clone()));
    let tea = ledger
        .create_memory(memory("alice", "Alice drinks green tea every morning", 0.8, 0.7, &["tea"]))
        .await
        .unwrap();
    ledger
        .create_memory(memory("alice", "Alice is training for a marathon", 0.6, 0.9, &["running"]))
        .await
        .unwrap();
    ledger
        .create_memory(memory("bob", "Bob prefers coffee", 0.9, 0.9, &[]))
        .await
        .unwrap();
    ledger
        .create_ritual(NewRitual {
            user_id: "alice".into(),
            name: "morning check-in".into(),
            description: "Ask how the run went".into(),
            frequency: RitualFrequency::EverySession,
        })
        .await
        .unwrap();

    let injector = ContinuityInjector::new(ledger.clone());
    injector
        .create_continuity_hook(
            "alice",
            HookTrigger::SessionStart,
            HookAction::Message {
                text: "Welcome back, Alice".into(),
            },
            HookOptions { priority: 10 },
        )
        .await
        .unwrap();

    let session = injector.start_session("alice", "morning").await.unwrap();
    assert_eq!(session.continuity_hooks.len(), 1);

    let ctx = InjectionContext::new("alice", "morning", 1000)
        .with_topic("tea")
        .with_message("What should I drink before my run?");
    let result = injector.inject_memories(&ctx, None).await.unwrap();

    assert_eq!(result.strategy.name, "hybrid");
    assert_eq!(result.injected_memories.len(), 2);
    assert!(result.injected_memories.iter().all(|m| m.user_id == "alice"));
    assert!(result.injection_context.contains("1. Alice"));
    assert!(!result.injection_context.contains("Bob"));

    let relevance = injector
        .update_memory_relevance(&tea.id, RelevanceFeedback::helpful())
        .await
        .unwrap()
        .unwrap();
    assert!((relevance - 0.9).abs() < 1e-6);

    let summary = injector.end_session("morning").await.unwrap().unwrap();
    assert!(injector.end_session("morning").await.unwrap().is_none());

    // Everything survives a reopen
    let reopened = FileLedger::new(path);
    let stored_summary = reopened.get_memory(&summary.id).await.unwrap().unwrap();
    assert_eq!(stored_summary.category, SESSION_SUMMARY_CATEGORY);
    assert!(stored_summary.content.contains("Topics: tea."));

    let stored_tea = reopened.get_memory(&tea.id).await.unwrap().unwrap();
    assert!((stored_tea.relevance() - 0.9).abs() < 1e-6);
    assert_eq!(stored_tea.metadata.access_count, 1);

    let summaries = reopened
        .query_memories(MemoryQuery {
            user_id: Some("alice".into()),
            categories: vec![SESSION_SUMMARY_CATEGORY.into()],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(summaries.memories.len(), 1);
}

#[tokio::test]
async fn e2e_summary_feeds_the_next_session() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(FileLedger::new(ledger_path(&dir)));
    let injector = ContinuityInjector::new(ledger);

    injector.start_session("carol", "first").await.unwrap();
    let ctx = InjectionContext::new("carol", "first", 500).with_topic("gardening");
    injector.inject_memories(&ctx, None).await.unwrap();
    injector.end_session("first").await.unwrap();

    injector.start_session("carol", "second").await.unwrap();
    let ctx = InjectionContext::new("carol", "second", 500).with_topic("gardening");
    let result = injector.inject_memories(&ctx, None).await.unwrap();

    assert_eq!(result.injected_memories.len(), 1);
    assert_eq!(result.injected_memories[0].kind, MemoryKind::Continuity);
    assert!(result.injection_context.contains("gardening"));
}

#[tokio::test]
async fn e2e_config_file_drives_strategy_table() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[ledger]
backend = "file"
path = "{}"

[injection]
default_strategy = "brief"
default_max_tokens = 400

[injection.strategies.brief]
kind = "importance_based"
max_memories_per_injection = 1
importance_threshold = 0.2

[telemetry]
event_buffer = 8
"#,
            ledger_path(&dir).display().to_string().replace('\\', "/")
        ),
    )
    .unwrap();

    let config = AppConfig::load_from(&config_path).unwrap();
    assert_eq!(config.ledger.backend, LedgerBackend::File);

    let ledger = Arc::new(FileLedger::new(config.ledger.resolved_path()));
    for (content, importance) in [("low", 0.3), ("high", 0.95), ("mid", 0.6)] {
        ledger
            .create_memory(memory("dave", content, 0.5, importance, &[]))
            .await
            .unwrap();
    }

    let bus = Arc::new(EventBus::new(config.telemetry.event_buffer));
    let mut rx = bus.subscribe();
    let injector = ContinuityInjector::new(ledger)
        .with_strategies(StrategyTable::from_config(&config.injection).unwrap())
        .with_sink(bus.clone());

    let ctx = InjectionContext::new("dave", "s", config.injection.default_max_tokens);
    let result = injector.inject_memories(&ctx, None).await.unwrap();

    assert_eq!(result.strategy.name, "brief");
    assert_eq!(result.memory_ids().len(), 1);
    assert_eq!(result.injected_memories[0].content, "high");

    let event = rx.try_recv().unwrap();
    assert_eq!(event.kind(), "memories_injected");

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["strategy"]["parameters"]["injection_position"], "prepend");
}

#[tokio::test]
async fn e2e_unknown_default_strategy_falls_back_to_hybrid() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        "[injection]\ndefault_strategy = \"nonexistent_strategy\"\n",
    )
    .unwrap();

    let config = AppConfig::load_from(&config_path).unwrap();
    let table = StrategyTable::from_config(&config.injection).unwrap();
    assert_eq!(table.default_strategy().name, "hybrid");

    let ledger = Arc::new(FileLedger::new(ledger_path(&dir)));
    ledger
        .create_memory(memory("erin", "erin keeps bees", 0.8, 0.8, &[]))
        .await
        .unwrap();
    let injector = ContinuityInjector::new(ledger).with_strategies(table);
    let ctx = InjectionContext::new("erin", "s", config.injection.default_max_tokens);
    let result = injector.inject_memories(&ctx, None).await.unwrap();

    assert_eq!(result.strategy.name, "hybrid");
    assert_eq!(result.injected_memories.len(), 1);
}

#[tokio::test]
async fn e2e_offline_ledger_surfaces_errors() {
    let injector = ContinuityInjector::new(Arc::new(OfflineLedger));
    injector.start_session("erin", "s").await.unwrap();

    let ctx = InjectionContext::new("erin", "s", 300).with_topic("weather");
    let err = injector.inject_memories(&ctx, None).await.unwrap_err();
    assert!(matches!(err, Error::Ledger(LedgerError::Storage(_))));

    // A caller can degrade to a prompt without memory context
    let context = injector
        .inject_memories(&ctx, None)
        .await
        .map(|r| r.injection_context)
        .unwrap_or_default();
    assert!(context.is_empty());

    // The failed summary write keeps the session alive for a retry
    assert!(injector.end_session("s").await.is_err());
    assert_eq!(injector.active_sessions().await, vec!["s"]);

    let err = injector
        .update_memory_relevance("m", RelevanceFeedback::helpful())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Ledger(_)));
}
