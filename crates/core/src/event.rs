//! Continuity events and telemetry sinks.
//!
//! The injector reports what it did (sessions started and ended, memories
//! injected, hooks created, relevance moved) through a [`TelemetrySink`].
//! Sinks are fire-and-forget: `emit` never blocks and never fails into
//! the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All continuity events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContinuityEvent {
    /// A continuity session began
    SessionStarted {
        user_id: String,
        session_id: String,
        hooks_triggered: usize,
        timestamp: DateTime<Utc>,
    },

    /// A session ended and was summarized into the ledger
    SessionEnded {
        user_id: String,
        session_id: String,
        interactions: usize,
        summary_memory_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Memories were selected for a turn
    MemoriesInjected {
        session_id: String,
        strategy: String,
        memories_considered: usize,
        memories_injected: usize,
        total_tokens: u32,
        relevance_score: f32,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A continuity hook was created
    HookCreated {
        user_id: String,
        hook_id: String,
        trigger: String,
        timestamp: DateTime<Utc>,
    },

    /// Feedback moved a memory's relevance
    RelevanceUpdated {
        memory_id: String,
        previous: f32,
        current: f32,
        timestamp: DateTime<Utc>,
    },
}

impl ContinuityEvent {
    /// Snake-case name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::SessionEnded { .. } => "session_ended",
            Self::MemoriesInjected { .. } => "memories_injected",
            Self::HookCreated { .. } => "hook_created",
            Self::RelevanceUpdated { .. } => "relevance_updated",
        }
    }
}

/// Destination for continuity events.
pub trait TelemetrySink: Send + Sync {
    /// Record an event. Must not block or panic.
    fn emit(&self, event: ContinuityEvent);
}

/// A broadcast-based event bus for continuity events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// Components can subscribe to receive all events and filter for what they care about.
pub struct EventBus {
    sender: broadcast::Sender<Arc<ContinuityEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: ContinuityEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ContinuityEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl TelemetrySink for EventBus {
    fn emit(&self, event: ContinuityEvent) {
        self.publish(event);
    }
}

/// A sink that writes every event to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn emit(&self, event: ContinuityEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => tracing::info!(kind = event.kind(), event = %json, "continuity event"),
            Err(e) => tracing::warn!(kind = event.kind(), error = %e, "unserializable event"),
        }
    }
}
