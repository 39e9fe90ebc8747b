//! Continuity sessions and the registry that owns them.
//!
//! Each session sits behind its own `tokio::sync::Mutex`. A turn holds that
//! lock for its whole bookkeeping sequence, so turns of one session are
//! serialized while different sessions proceed in parallel. The outer
//! `RwLock` only guards membership of the map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Lifecycle of a registered session. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Ended,
}

/// One turn's entry in a session's context history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    /// Tokens injected on this turn
    pub injected_tokens: u32,
}

/// Bookkeeping for a bounded span of conversational turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuitySession {
    pub session_id: String,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Ids of every memory injected so far, in order, duplicates kept
    pub injected_memories: Vec<String>,
    /// Ids of hooks triggered at session start and on each turn
    pub continuity_hooks: Vec<String>,
    pub context_history: Vec<ContextSnapshot>,
    pub state: SessionState,
}

impl ContinuitySession {
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            start_time: now,
            last_activity: now,
            injected_memories: Vec::new(),
            continuity_hooks: Vec::new(),
            context_history: Vec::new(),
            state: SessionState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn interaction_count(&self) -> usize {
        self.context_history.len()
    }

    /// Distinct topics in the order they first came up.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = Vec::new();
        for topic in self.context_history.iter().filter_map(|s| s.topic.as_deref()) {
            if !topics.iter().any(|t| t.eq_ignore_ascii_case(topic)) {
                topics.push(topic.to_string());
            }
        }
        topics
    }

    /// Record one turn: its history entry, the memories it injected and
    /// the hooks it fired.
    pub fn record_turn(
        &mut self,
        snapshot: ContextSnapshot,
        memory_ids: impl IntoIterator<Item = String>,
        hook_ids: impl IntoIterator<Item = String>,
    ) {
        self.last_activity = snapshot.timestamp;
        self.context_history.push(snapshot);
        self.injected_memories.extend(memory_ids);
        self.continuity_hooks.extend(hook_ids);
    }

    pub fn duration_secs(&self) -> i64 {
        (self.last_activity - self.start_time).num_seconds().max(0)
    }
}

pub type SessionHandle = Arc<Mutex<ContinuitySession>>;

/// In-memory map of live sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session, replacing any previous session with the same id.
    pub async fn insert(&self, session: ContinuitySession) -> SessionHandle {
        let id = session.session_id.clone();
        let handle = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id, handle.clone());
        handle
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Remove `session_id` only if it still maps to `handle`, so a session
    /// restarted under the same id is left alone.
    pub async fn remove_if_same(&self, session_id: &str, handle: &SessionHandle) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(session_id) {
            Some(current) if Arc::ptr_eq(current, handle) => {
                sessions.remove(session_id);
                true
            }
            _ => false,
        }
    }

    /// Copy of a session's current state.
    pub async fn snapshot(&self, session_id: &str) -> Option<ContinuitySession> {
        let handle = self.get(session_id).await?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    pub async fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(topic: Option<&str>, tokens: u32) -> ContextSnapshot {
        ContextSnapshot {
            timestamp: Utc::now(),
            topic: topic.map(String::from),
            intent: None,
            injected_tokens: tokens,
        }
    }

    #[test]
    fn record_turn_appends_without_dedup() {
        let mut session = ContinuitySession::new("u", "s", Utc::now());
        session.record_turn(snapshot(Some("rust"), 10), vec!["m1".into()], vec![]);
        session.record_turn(
            snapshot(Some("Rust"), 20),
            vec!["m1".into(), "m2".into()],
            vec!["h1".into()],
        );

        assert_eq!(session.interaction_count(), 2);
        assert_eq!(session.injected_memories, vec!["m1", "m1", "m2"]);
        assert_eq!(session.continuity_hooks, vec!["h1"]);
        assert_eq!(session.topics(), vec!["rust"]);
        assert_eq!(session.context_history[1].injected_tokens, 20);
    }

    #[tokio::test]
    async fn registry_insert_get_remove() {
        let registry = SessionRegistry::new();
        let handle = registry
            .insert(ContinuitySession::new("u", "s1", Utc::now()))
            .await;
        registry
            .insert(ContinuitySession::new("u", "s2", Utc::now()))
            .await;

        assert_eq!(registry.len().await, 2);
        assert_eq!(registry.session_ids().await, vec!["s1", "s2"]);
        assert_eq!(registry.snapshot("s1").await.unwrap().user_id, "u");

        assert!(registry.remove_if_same("s1", &handle).await);
        assert!(!registry.remove_if_same("s1", &handle).await);
        assert!(registry.get("s1").await.is_none());
    }

    #[tokio::test]
    async fn remove_ignores_replaced_session() {
        let registry = SessionRegistry::new();
        let old = registry
            .insert(ContinuitySession::new("u", "s", Utc::now()))
            .await;
        registry
            .insert(ContinuitySession::new("u", "s", Utc::now()))
            .await;

        assert!(!registry.remove_if_same("s", &old).await);
        assert_eq!(registry.len().await, 1);
    }
}
