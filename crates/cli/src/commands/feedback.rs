//! `chatty feedback`: Apply relevance feedback to a memory.

use chatty_continuity::RelevanceFeedback;

use super::{CliResult, build_injector, load_config, open_ledger};

pub async fn run(
    memory_id: &str,
    was_helpful: bool,
    context_relevance: f32,
    user_feedback: Option<f32>,
) -> CliResult {
    let config = load_config()?;
    let injector = build_injector(&config, open_ledger(&config))?;

    let feedback = RelevanceFeedback {
        was_helpful,
        context_relevance,
        user_feedback,
    };
    match injector.update_memory_relevance(memory_id, feedback).await? {
        Some(relevance) => println!("Memory {memory_id} relevance is now {relevance:.2}"),
        None => println!("No memory with id {memory_id}"),
    }
    Ok(())
}
