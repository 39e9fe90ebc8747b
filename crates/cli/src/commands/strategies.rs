//! `chatty strategies`: Show the injection strategy table.

use chatty_continuity::StrategyTable;

use super::{CliResult, load_config};

pub async fn run() -> CliResult {
    let config = load_config()?;
    let table = StrategyTable::from_config(&config.injection)?;
    let default = table.default_strategy().name.clone();

    println!("Injection Strategies");
    println!("====================");
    println!(
        "  {:<18} {:>6} {:>6} {:>5} {:>8} {:<11} {:>6}",
        "name", "rel", "imp", "max", "reserve", "position", "boost"
    );
    for strategy in table.iter() {
        let p = &strategy.parameters;
        let marker = if strategy.name == default { "*" } else { " " };
        println!(
            "{marker} {:<18} {:>6.2} {:>6.2} {:>5} {:>8.2} {:<11} {:>6.2}",
            strategy.name,
            p.relevance_threshold,
            p.importance_threshold,
            p.max_memories_per_injection,
            p.token_reservation,
            p.injection_position.to_string(),
            p.semantic_boost
        );
    }
    println!();
    println!("  * default; unknown names fall back to hybrid");

    Ok(())
}
