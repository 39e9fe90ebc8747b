//! Memory entries: the unit of conversational recall.
//!
//! A memory is written once by the ledger and never has its content
//! changed afterwards. Only the scoring metadata (`relevance`,
//! `importance`, access counters, tags) moves over time, driven by
//! relevance feedback and usage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single memory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique ID for this memory
    pub id: String,

    /// Owning user
    pub user_id: String,

    /// Session in which the memory was recorded
    pub session_id: String,

    /// What kind of memory this is
    pub kind: MemoryKind,

    /// Free-form category label (e.g. "session_summary", "preference")
    pub category: String,

    /// The content of the memory
    pub content: String,

    /// When this memory was created
    pub timestamp: DateTime<Utc>,

    /// Scoring and bookkeeping metadata
    pub metadata: MemoryMetadata,
}

impl MemoryEntry {
    /// Relevance score in `[0, 1]`.
    pub fn relevance(&self) -> f32 {
        self.metadata.relevance
    }

    /// Importance score in `[0, 1]`.
    pub fn importance(&self) -> f32 {
        self.metadata.importance
    }

    /// Opaque token count supplied by the ledger.
    pub fn token_count(&self) -> u32 {
        self.metadata.token_count
    }
}

/// The kind of a memory entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Something said during a conversation
    #[default]
    Conversation,
    /// A stated fact about the user or the world
    Fact,
    /// A user preference
    Preference,
    /// Something about the relationship between user and construct
    Relationship,
    /// Output of a recurring ritual
    Ritual,
    /// Continuity bookkeeping (session summaries and the like)
    Continuity,
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conversation => write!(f, "conversation"),
            Self::Fact => write!(f, "fact"),
            Self::Preference => write!(f, "preference"),
            Self::Relationship => write!(f, "relationship"),
            Self::Ritual => write!(f, "ritual"),
            Self::Continuity => write!(f, "continuity"),
        }
    }
}

impl std::str::FromStr for MemoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conversation" => Ok(Self::Conversation),
            "fact" => Ok(Self::Fact),
            "preference" => Ok(Self::Preference),
            "relationship" => Ok(Self::Relationship),
            "ritual" => Ok(Self::Ritual),
            "continuity" => Ok(Self::Continuity),
            other => Err(format!("unknown memory kind: {other}")),
        }
    }
}

/// Scoring metadata attached to every memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    /// How much this memory matters, `[0, 1]`
    pub importance: f32,

    /// How relevant it has proven to be, `[0, 1]`; moved by feedback
    pub relevance: f32,

    /// Token cost of injecting the content
    pub token_count: u32,

    /// How many times the memory has been read back
    #[serde(default)]
    pub access_count: u32,

    /// Tags for categorization
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// When the memory was last read back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,

    /// Kind-specific details
    #[serde(default)]
    pub detail: MemoryDetail,
}

/// Kind-specific memory details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemoryDetail {
    /// No extra details
    #[default]
    General,

    /// Recorded from a single conversational turn
    Turn {
        conversation_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic: Option<String>,
    },

    /// Written when a continuity session ends
    SessionSummary {
        interaction_count: usize,
        injected_memory_count: usize,
        hook_count: usize,
        duration_secs: i64,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        topics: Vec<String>,
    },
}

/// Clamp a score into `[0, 1]`. NaN collapses to 0.
pub fn clamp_score(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A query for candidate memories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryQuery {
    /// Only memories owned by this user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Only memories recorded in this session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Topic used to rank matching memories higher
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    /// User intent used to rank matching memories higher
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_intent: Option<String>,

    /// Restrict to these kinds (empty = any)
    #[serde(default)]
    pub kinds: Vec<MemoryKind>,

    /// Restrict to these categories (empty = any)
    #[serde(default)]
    pub categories: Vec<String>,

    /// Require at least one of these tags (empty = any)
    #[serde(default)]
    pub tags: Vec<String>,

    /// Token ceiling for the returned set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Maximum number of results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// The outcome of a ledger query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryQueryResult {
    /// Matching memories, best first
    pub memories: Vec<MemoryEntry>,
    /// Sum of `token_count` over `memories`
    pub total_tokens: u32,
    /// Mean relevance of `memories` (0 when empty)
    pub relevance_score: f32,
}

impl MemoryQueryResult {
    /// Build a result from an already-selected list of memories.
    pub fn from_memories(memories: Vec<MemoryEntry>) -> Self {
        let total_tokens = memories.iter().map(|m| m.token_count()).sum();
        let relevance_score = if memories.is_empty() {
            0.0
        } else {
            memories.iter().map(|m| m.relevance()).sum::<f32>() / memories.len() as f32
        };
        Self {
            memories,
            total_tokens,
            relevance_score,
        }
    }
}

/// Draft for a memory the ledger should create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMemory {
    pub user_id: String,
    pub session_id: String,
    pub kind: MemoryKind,
    pub category: String,
    pub content: String,
    pub importance: f32,
    pub relevance: f32,
    /// `None` lets the ledger estimate the count from the content.
    #[serde(default)]
    pub token_count: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub detail: MemoryDetail,
}

/// Partial update to a memory's metadata. `None` fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryUpdate {
    pub relevance: Option<f32>,
    pub importance: Option<f32>,
    pub tags: Option<Vec<String>>,
    pub access_count: Option<u32>,
    pub last_accessed: Option<DateTime<Utc>>,
}

impl MemoryUpdate {
    /// An update that only moves relevance.
    pub fn relevance(value: f32) -> Self {
        Self {
            relevance: Some(value),
            ..Default::default()
        }
    }
}
