//! File-based ledger: persistent JSON-lines storage.
//!
//! Each line is one tagged record: a memory, a continuity hook, or a ritual
//! (`{"record":"memory", ...}`). The file is human-inspectable and needs no
//! external database.
//!
//! Storage location: `~/.chatty/ledger.jsonl`

use async_trait::async_trait;
use chatty_core::error::LedgerError;
use chatty_core::hook::{ContinuityHook, HookContext, NewHook, NewRitual, Ritual};
use chatty_core::ledger::MemoryLedger;
use chatty_core::memory::{MemoryEntry, MemoryQuery, MemoryQueryResult, MemoryUpdate, NewMemory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::state::LedgerState;

/// One line of the ledger file, as read.
#[derive(Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum LedgerRecord {
    Memory(MemoryEntry),
    Hook(ContinuityHook),
    Ritual(Ritual),
}

/// One line of the ledger file, as written.
#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum LedgerRecordRef<'a> {
    Memory(&'a MemoryEntry),
    Hook(&'a ContinuityHook),
    Ritual(&'a Ritual),
}

/// A file-backed ledger using JSONL (one JSON object per line).
///
/// Records are loaded into memory on creation and the file is rewritten on
/// every mutation. A mutation is applied to a copy of the state and only
/// becomes visible once the copy has been written, so a failed write
/// leaves both the file and the in-memory view unchanged.
pub struct FileLedger {
    path: PathBuf,
    state: Arc<RwLock<LedgerState>>,
}

impl FileLedger {
    /// Open a file-based ledger at the given path.
    ///
    /// If the file exists, records are loaded from it.
    /// If the file does not exist, starts empty (file created on first write).
    pub fn new(path: PathBuf) -> Self {
        let state = Self::load_from_disk(&path);
        debug!(
            path = %path.display(),
            memories = state.memories.len(),
            hooks = state.hooks.len(),
            rituals = state.rituals.len(),
            "File ledger loaded"
        );
        Self {
            path,
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Default path: `~/.chatty/ledger.jsonl`
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".chatty").join("ledger.jsonl")
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> LedgerState {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return LedgerState::new(), // Not created yet
        };

        let mut state = LedgerState::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LedgerRecord>(line) {
                Ok(LedgerRecord::Memory(m)) => state.memories.push(m),
                Ok(LedgerRecord::Hook(h)) => state.hooks.push(h),
                Ok(LedgerRecord::Ritual(r)) => state.rituals.push(r),
                Err(e) => warn!(line = lineno + 1, error = %e, "Skipping corrupted ledger record"),
            }
        }
        state
    }

    fn write_to_disk(path: &Path, state: &LedgerState) -> Result<(), LedgerError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    LedgerError::Storage(format!("Failed to create ledger directory: {e}"))
                })?;
            }
        }

        let records = state
            .memories
            .iter()
            .map(LedgerRecordRef::Memory)
            .chain(state.hooks.iter().map(LedgerRecordRef::Hook))
            .chain(state.rituals.iter().map(LedgerRecordRef::Ritual));

        let mut content = String::new();
        for record in records {
            let line = serde_json::to_string(&record).map_err(|e| {
                LedgerError::Serialization(format!("Failed to serialize ledger record: {e}"))
            })?;
            content.push_str(&line);
            content.push('\n');
        }

        std::fs::write(path, &content)
            .map_err(|e| LedgerError::Storage(format!("Failed to write ledger file: {e}")))
    }

    /// Apply `f` to a copy of the state, persist the copy, then publish it.
    async fn mutate<T, F>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut LedgerState) -> Result<T, LedgerError> + Send,
        T: Send,
    {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        Self::write_to_disk(&self.path, &next)?;
        *guard = next;
        Ok(out)
    }
}

#[async_trait]
impl MemoryLedger for FileLedger {
    fn name(&self) -> &str {
        "file"
    }

    async fn query_memories(&self, query: MemoryQuery) -> Result<MemoryQueryResult, LedgerError> {
        Ok(self.state.read().await.query(&query))
    }

    async fn get_memory(&self, id: &str) -> Result<Option<MemoryEntry>, LedgerError> {
        Ok(self.state.read().await.get_memory(id).cloned())
    }

    async fn create_memory(&self, memory: NewMemory) -> Result<MemoryEntry, LedgerError> {
        let now = Utc::now();
        self.mutate(|s| Ok(s.create_memory(memory, now))).await
    }

    async fn update_memory(&self, id: &str, update: MemoryUpdate) -> Result<(), LedgerError> {
        self.mutate(|s| s.update_memory(id, update)).await
    }

    async fn touch_memories(&self, ids: &[String], at: DateTime<Utc>) -> Result<(), LedgerError> {
        if ids.is_empty() {
            return Ok(());
        }
        let touched = self.mutate(|s| Ok(s.touch_memories(ids, at))).await?;
        debug!(requested = ids.len(), touched, "Memory accesses recorded");
        Ok(())
    }

    async fn check_continuity_hooks(
        &self,
        user_id: &str,
        ctx: &HookContext,
    ) -> Result<Vec<ContinuityHook>, LedgerError> {
        self.mutate(|s| Ok(s.check_hooks(user_id, ctx))).await
    }

    async fn create_continuity_hook(&self, hook: NewHook) -> Result<ContinuityHook, LedgerError> {
        let now = Utc::now();
        self.mutate(|s| Ok(s.create_hook(hook, now))).await
    }

    async fn create_ritual(&self, ritual: NewRitual) -> Result<Ritual, LedgerError> {
        self.mutate(|s| Ok(s.create_ritual(ritual))).await
    }

    async fn execute_rituals(&self, user_id: &str) -> Result<Vec<Ritual>, LedgerError> {
        let now = Utc::now();
        self.mutate(|s| Ok(s.execute_rituals(user_id, now))).await
    }
}
