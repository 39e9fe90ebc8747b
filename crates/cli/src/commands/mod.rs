//! CLI subcommands and the wiring they share.

pub mod config_cmd;
pub mod feedback;
pub mod hook;
pub mod inject;
pub mod memory;
pub mod ritual;
pub mod strategies;

use chatty_config::{AppConfig, LedgerBackend};
use chatty_continuity::{ContinuityInjector, StrategyTable};
use chatty_core::event::TracingSink;
use chatty_core::ledger::MemoryLedger;
use chatty_memory::{FileLedger, InMemoryLedger, NoopLedger};
use std::sync::Arc;
use tracing::debug;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub fn load_config() -> CliResult<AppConfig> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Open the ledger selected by `ledger.backend`.
pub fn open_ledger(config: &AppConfig) -> Arc<dyn MemoryLedger> {
    let ledger: Arc<dyn MemoryLedger> = match config.ledger.backend {
        LedgerBackend::File => Arc::new(FileLedger::new(config.ledger.resolved_path())),
        LedgerBackend::Memory => Arc::new(InMemoryLedger::new()),
        LedgerBackend::None => Arc::new(NoopLedger),
    };
    debug!(backend = ledger.name(), "Ledger opened");
    ledger
}

/// An injector over `ledger` with the configured strategies and sink.
pub fn build_injector(
    config: &AppConfig,
    ledger: Arc<dyn MemoryLedger>,
) -> CliResult<ContinuityInjector> {
    let strategies = StrategyTable::from_config(&config.injection)?;
    let mut injector = ContinuityInjector::new(ledger).with_strategies(strategies);
    if config.telemetry.enabled {
        injector = injector.with_sink(Arc::new(TracingSink));
    }
    Ok(injector)
}
