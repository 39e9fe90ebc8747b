//! Memory ledger implementations for Chatty.

pub mod file_backend;
pub mod in_memory;
pub mod noop;
pub mod state;

pub use file_backend::FileLedger;
pub use in_memory::InMemoryLedger;
pub use noop::NoopLedger;
pub use state::LedgerState;
