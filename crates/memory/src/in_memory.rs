//! In-memory ledger: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chatty_core::error::LedgerError;
use chatty_core::hook::{ContinuityHook, HookContext, NewHook, NewRitual, Ritual};
use chatty_core::ledger::MemoryLedger;
use chatty_core::memory::{MemoryEntry, MemoryQuery, MemoryQueryResult, MemoryUpdate, NewMemory};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::state::LedgerState;

/// An in-memory ledger that keeps everything in a `LedgerState`.
/// Useful for testing and sessions where persistence isn't needed.
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState::new())),
        }
    }

    /// Number of stored memories.
    pub async fn memory_count(&self) -> usize {
        self.state.read().await.memories.len()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryLedger for InMemoryLedger {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn query_memories(&self, query: MemoryQuery) -> Result<MemoryQueryResult, LedgerError> {
        Ok(self.state.read().await.query(&query))
    }

    async fn get_memory(&self, id: &str) -> Result<Option<MemoryEntry>, LedgerError> {
        Ok(self.state.read().await.get_memory(id).cloned())
    }

    async fn create_memory(&self, memory: NewMemory) -> Result<MemoryEntry, LedgerError> {
        Ok(self.state.write().await.create_memory(memory, Utc::now()))
    }

    async fn update_memory(&self, id: &str, update: MemoryUpdate) -> Result<(), LedgerError> {
        self.state.write().await.update_memory(id, update)
    }

    async fn touch_memories(&self, ids: &[String], at: DateTime<Utc>) -> Result<(), LedgerError> {
        self.state.write().await.touch_memories(ids, at);
        Ok(())
    }

    async fn check_continuity_hooks(
        &self,
        user_id: &str,
        ctx: &HookContext,
    ) -> Result<Vec<ContinuityHook>, LedgerError> {
        Ok(self.state.write().await.check_hooks(user_id, ctx))
    }

    async fn create_continuity_hook(&self, hook: NewHook) -> Result<ContinuityHook, LedgerError> {
        Ok(self.state.write().await.create_hook(hook, Utc::now()))
    }

    async fn create_ritual(&self, ritual: NewRitual) -> Result<Ritual, LedgerError> {
        Ok(self.state.write().await.create_ritual(ritual))
    }

    async fn execute_rituals(&self, user_id: &str) -> Result<Vec<Ritual>, LedgerError> {
        Ok(self.state.write().await.execute_rituals(user_id, Utc::now()))
    }
}
