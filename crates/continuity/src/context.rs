//! Per-call input and output of memory injection.

use chatty_core::hook::ContinuityHook;
use chatty_core::memory::MemoryEntry;
use chatty_core::strategy::InjectionStrategy;
use serde::{Deserialize, Serialize};

/// The model a prompt is being built for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelContext {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u32>,
}

/// Everything the injector knows about the current turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionContext {
    pub user_id: String,
    pub session_id: String,
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_intent: Option<String>,
    #[serde(default)]
    pub current_message: String,
    /// Earlier messages of the conversation, oldest first
    #[serde(default)]
    pub conversation_history: Vec<String>,
    /// Token budget for the whole injection, before reservation
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_context: Option<ModelContext>,
}

impl InjectionContext {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            conversation_id: String::new(),
            topic: None,
            user_intent: None,
            current_message: String::new(),
            conversation_history: Vec::new(),
            max_tokens,
            model_context: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.user_intent = Some(intent.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.current_message = message.into();
        self
    }

    pub fn with_history(mut self, history: Vec<String>) -> Self {
        self.conversation_history = history;
        self
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = conversation_id.into();
        self
    }
}

/// Counters describing how a result was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionMetadata {
    /// Candidates returned by the ledger
    pub memories_considered: usize,
    /// Candidates dropped by thresholds, cardinality or budget
    pub memories_filtered: usize,
    /// Wall time spent in the call
    pub injection_time_ms: u64,
    /// `total_tokens / max_tokens`, 0 for a zero budget
    pub token_efficiency: f32,
}

/// The memories chosen for a turn and the text to splice into the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionResult {
    /// Ranked memories, best first
    pub injected_memories: Vec<MemoryEntry>,
    pub total_tokens: u32,
    /// Relevance reported by the ledger for the base candidate set
    pub relevance_score: f32,
    /// Plain text for the prompt builder; empty when there is nothing to say
    pub injection_context: String,
    /// The strategy actually applied, after fallback
    pub strategy: InjectionStrategy,
    /// Hooks that fired for this turn
    pub triggered_hooks: Vec<ContinuityHook>,
    pub metadata: InjectionMetadata,
}

impl InjectionResult {
    pub fn memory_ids(&self) -> Vec<&str> {
        self.injected_memories.iter().map(|m| m.id.as_str()).collect()
    }
}
