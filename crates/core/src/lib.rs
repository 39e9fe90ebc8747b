//! # Chatty Core
//!
//! Domain types, traits, and error definitions for the Chatty memory
//! continuity layer. This crate performs **no I/O**; it defines the domain
//! model that the ledger backends and the continuity injector implement
//! against.
//!
//! ## Design Philosophy
//!
//! The memory ledger and the telemetry sink are traits here. Implementations
//! live in their respective crates. This enables:
//! - Swapping ledgers via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod hook;
pub mod ledger;
pub mod memory;
pub mod strategy;
pub mod token;

// Re-export key types at crate root for ergonomics
pub use error::{Error, LedgerError, Result};
pub use event::{ContinuityEvent, EventBus, TelemetrySink, TracingSink};
pub use hook::{
    ContinuityHook, HookAction, HookContext, HookTrigger, NewHook, NewRitual, Ritual,
    RitualFrequency,
};
pub use ledger::MemoryLedger;
pub use memory::{
    MemoryDetail, MemoryEntry, MemoryKind, MemoryMetadata, MemoryQuery, MemoryQueryResult,
    MemoryUpdate, NewMemory,
};
pub use strategy::{InjectionPosition, InjectionStrategy, StrategyKind, StrategyParameters};
