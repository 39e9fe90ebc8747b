//! The `MemoryLedger` trait, the system of record for memories, hooks and rituals.
//!
//! The continuity layer never stores memory content itself. Everything it
//! injects is read through a ledger, and every change it makes (feedback,
//! session summaries, new hooks) is written back through one.
//!
//! Implementations must either succeed or return an error; a failed call
//! must not leave partial state behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::LedgerError;
use crate::hook::{ContinuityHook, HookContext, NewHook, NewRitual, Ritual};
use crate::memory::{MemoryEntry, MemoryQuery, MemoryQueryResult, MemoryUpdate, NewMemory};

/// The core MemoryLedger trait.
///
/// Implementations: file (JSONL), in-memory (for testing), none (no-op).
#[async_trait]
pub trait MemoryLedger: Send + Sync {
    /// The ledger name (e.g., "file", "in_memory", "none").
    fn name(&self) -> &str;

    /// Query candidate memories, best first, truncated to the query's
    /// token ceiling.
    async fn query_memories(&self, query: MemoryQuery) -> Result<MemoryQueryResult, LedgerError>;

    /// Get a memory by ID.
    async fn get_memory(&self, id: &str) -> Result<Option<MemoryEntry>, LedgerError>;

    /// Create a new memory.
    async fn create_memory(&self, memory: NewMemory) -> Result<MemoryEntry, LedgerError>;

    /// Apply a partial update. Unknown ids yield `LedgerError::NotFound`.
    async fn update_memory(&self, id: &str, update: MemoryUpdate) -> Result<(), LedgerError>;

    /// Record one access of each memory in `ids` at `at`: bump its access
    /// count and set `last_accessed`. Unknown ids are skipped.
    ///
    /// The default goes through `get_memory`/`update_memory` per id;
    /// storing backends override it to apply the whole batch at once.
    async fn touch_memories(&self, ids: &[String], at: DateTime<Utc>) -> Result<(), LedgerError> {
        for id in ids {
            let Some(memory) = self.get_memory(id).await? else {
                continue;
            };
            let update = MemoryUpdate {
                access_count: Some(memory.metadata.access_count.saturating_add(1)),
                last_accessed: Some(at),
                ..Default::default()
            };
            match self.update_memory(id, update).await {
                Ok(()) | Err(LedgerError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Return the user's hooks that fire for `ctx`, highest priority first.
    async fn check_continuity_hooks(
        &self,
        user_id: &str,
        ctx: &HookContext,
    ) -> Result<Vec<ContinuityHook>, LedgerError>;

    /// Create a new continuity hook.
    async fn create_continuity_hook(&self, hook: NewHook) -> Result<ContinuityHook, LedgerError>;

    /// Create a new ritual.
    async fn create_ritual(&self, ritual: NewRitual) -> Result<Ritual, LedgerError>;

    /// Run the user's due rituals and return the ones executed.
    async fn execute_rituals(&self, user_id: &str) -> Result<Vec<Ritual>, LedgerError>;
}
