//! `chatty ritual`: Create a session ritual.

use chatty_core::hook::{NewRitual, RitualFrequency};

use super::{CliResult, load_config, open_ledger};

pub async fn run(user: String, name: String, description: String, frequency: &str) -> CliResult {
    let frequency: RitualFrequency = frequency.parse()?;
    let config = load_config()?;
    let ledger = open_ledger(&config);

    let ritual = ledger
        .create_ritual(NewRitual {
            user_id: user,
            name,
            description,
            frequency,
        })
        .await?;

    println!("Created ritual '{}' ({})", ritual.name, ritual.id);
    Ok(())
}
