//! No-op ledger: disables persistent memory entirely.
//!
//! Creates return a well-formed record that is never stored, so callers
//! that only need the id or the echo keep working.

use async_trait::async_trait;
use chatty_core::error::LedgerError;
use chatty_core::hook::{ContinuityHook, HookContext, NewHook, NewRitual, Ritual};
use chatty_core::ledger::MemoryLedger;
use chatty_core::memory::{MemoryEntry, MemoryQuery, MemoryQueryResult, MemoryUpdate, NewMemory};
use chrono::Utc;

use crate::state::LedgerState;

/// A no-op ledger that stores nothing.
pub struct NoopLedger;

#[async_trait]
impl MemoryLedger for NoopLedger {
    fn name(&self) -> &str {
        "none"
    }

    async fn query_memories(&self, _query: MemoryQuery) -> Result<MemoryQueryResult, LedgerError> {
        Ok(MemoryQueryResult::default())
    }

    async fn get_memory(&self, _id: &str) -> Result<Option<MemoryEntry>, LedgerError> {
        Ok(None)
    }

    async fn create_memory(&self, memory: NewMemory) -> Result<MemoryEntry, LedgerError> {
        Ok(LedgerState::new().create_memory(memory, Utc::now()))
    }

    async fn update_memory(&self, id: &str, _update: MemoryUpdate) -> Result<(), LedgerError> {
        Err(LedgerError::NotFound(format!("memory {id}")))
    }

    async fn check_continuity_hooks(
        &self,
        _user_id: &str,
        _ctx: &HookContext,
    ) -> Result<Vec<ContinuityHook>, LedgerError> {
        Ok(Vec::new())
    }

    async fn create_continuity_hook(&self, hook: NewHook) -> Result<ContinuityHook, LedgerError> {
        Ok(LedgerState::new().create_hook(hook, Utc::now()))
    }

    async fn create_ritual(&self, ritual: NewRitual) -> Result<Ritual, LedgerError> {
        Ok(LedgerState::new().create_ritual(ritual))
    }

    async fn execute_rituals(&self, _user_id: &str) -> Result<Vec<Ritual>, LedgerError> {
        Ok(Vec::new())
    }
}
