//! # Chatty Continuity
//!
//! Memory injection and session continuity. For every conversational turn
//! the [`ContinuityInjector`] asks a memory ledger for candidates, ranks
//! them with a named [`InjectionStrategy`](chatty_core::InjectionStrategy),
//! fits them into a token budget and renders the text a prompt builder
//! splices into the prompt.
//!
//! ```text
//! InjectionContext ─► StrategyTable::resolve ─► ledger query (budgeted)
//!                                                   │
//!        InjectionResult ◄─ render ◄─ budget fit ◄─ filter/boost/sort
//! ```

pub mod assembly;
pub mod context;
pub mod feedback;
pub mod injector;
pub mod ranking;
pub mod scoring;
pub mod session;
pub mod strategy;

pub use context::{InjectionContext, InjectionMetadata, InjectionResult, ModelContext};
pub use feedback::RelevanceFeedback;
pub use injector::{ContinuityInjector, HookOptions, SESSION_SUMMARY_CATEGORY};
pub use scoring::{RecencyUsageScorer, RelevanceScorer, SubstringScorer};
pub use session::{ContextSnapshot, ContinuitySession, SessionRegistry, SessionState};
pub use strategy::StrategyTable;
