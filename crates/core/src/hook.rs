//! Continuity hooks and rituals.
//!
//! A hook is a stored trigger/action pair that fires contextual behavior at
//! session boundaries or when a turn matches its trigger. A ritual is a
//! recurring action the ledger runs when a session starts, at most once per
//! its frequency interval.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// What makes a hook fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HookTrigger {
    /// Fires when a session starts
    SessionStart,
    /// Fires when the turn's topic mentions `topic` (case-insensitive)
    Topic { topic: String },
    /// Fires when the user's input contains `keyword` (case-insensitive)
    Keyword { keyword: String },
    /// Fires when the current UTC hour is within `[start_hour, end_hour)`.
    /// Windows may wrap around midnight; equal bounds mean all day.
    TimeWindow { start_hour: u32, end_hour: u32 },
}

impl HookTrigger {
    /// Short name of the trigger kind, as used in events and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionStart => "session_start",
            Self::Topic { .. } => "topic",
            Self::Keyword { .. } => "keyword",
            Self::TimeWindow { .. } => "time_window",
        }
    }

    /// Whether this trigger fires for the given context.
    ///
    /// A session-start check fires `SessionStart` triggers and nothing else.
    pub fn matches(&self, ctx: &HookContext) -> bool {
        if ctx.session_start {
            return matches!(self, Self::SessionStart);
        }
        match self {
            Self::SessionStart => false,
            Self::Topic { topic } => contains_ci(ctx.topic.as_deref(), topic),
            Self::Keyword { keyword } => contains_ci(ctx.user_input.as_deref(), keyword),
            Self::TimeWindow {
                start_hour,
                end_hour,
            } => {
                let hour = ctx.current_time.hour();
                if start_hour == end_hour {
                    true
                } else if start_hour < end_hour {
                    hour >= *start_hour && hour < *end_hour
                } else {
                    hour >= *start_hour || hour < *end_hour
                }
            }
        }
    }
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    match haystack {
        Some(h) if !needle.is_empty() => h.to_lowercase().contains(&needle.to_lowercase()),
        _ => false,
    }
}

/// What a hook does once triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HookAction {
    /// Surface a message (greeting, reminder)
    Message { text: String },
    /// Pull a specific memory back into view
    RecallMemory { memory_id: String },
    /// Run a named ritual
    Ritual { name: String },
}

/// A stored continuity hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuityHook {
    pub id: String,
    pub user_id: String,
    pub trigger: HookTrigger,
    pub action: HookAction,
    /// Higher fires first
    #[serde(default)]
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trigger_count: u32,
}

/// Draft for a hook the ledger should create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHook {
    pub user_id: String,
    pub trigger: HookTrigger,
    pub action: HookAction,
    #[serde(default)]
    pub priority: i32,
}

/// The situation a hook check is evaluated against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookContext {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input: Option<String>,
    pub current_time: DateTime<Utc>,
    /// True only for the check made while a session is starting
    #[serde(default)]
    pub session_start: bool,
}

impl HookContext {
    /// Context for the check made when a session starts.
    pub fn session_start(session_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            conversation_id: None,
            topic: None,
            user_input: None,
            current_time: now,
            session_start: true,
        }
    }
}

/// How often a ritual may run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RitualFrequency {
    #[default]
    EverySession,
    Daily,
    Weekly,
}

impl std::str::FromStr for RitualFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "every_session" => Ok(Self::EverySession),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            other => Err(format!("unknown ritual frequency: {other}")),
        }
    }
}

/// A recurring ritual owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ritual {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub frequency: RitualFrequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_executed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub execution_count: u32,
}

impl Ritual {
    /// Whether the ritual should run at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        let Some(last) = self.last_executed else {
            return true;
        };
        match self.frequency {
            RitualFrequency::EverySession => true,
            RitualFrequency::Daily => now - last >= Duration::hours(24),
            RitualFrequency::Weekly => now - last >= Duration::days(7),
        }
    }
}

/// Draft for a ritual the ledger should create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRitual {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub frequency: RitualFrequency,
}
