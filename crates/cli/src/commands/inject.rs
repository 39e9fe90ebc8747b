//! `chatty inject`: Run one turn of memory injection.
//!
//! Sessions live only as long as the process, so every invocation starts
//! its session (firing rituals and session-start hooks) before the turn.

use chatty_continuity::InjectionContext;

use super::{CliResult, build_injector, load_config, open_ledger};

pub struct InjectArgs {
    pub user: String,
    pub session: String,
    pub topic: Option<String>,
    pub intent: Option<String>,
    pub message: String,
    pub history: Vec<String>,
    pub max_tokens: Option<u32>,
    pub strategy: Option<String>,
    pub json: bool,
    pub end: bool,
}

pub async fn run(args: InjectArgs) -> CliResult {
    let config = load_config()?;
    let injector = build_injector(&config, open_ledger(&config))?;

    let session = injector.start_session(&args.user, &args.session).await?;

    let mut ctx = InjectionContext::new(
        &args.user,
        &args.session,
        args.max_tokens.unwrap_or(config.injection.default_max_tokens),
    )
    .with_message(args.message)
    .with_history(args.history);
    if let Some(topic) = args.topic {
        ctx = ctx.with_topic(topic);
    }
    if let Some(intent) = args.intent {
        ctx = ctx.with_intent(intent);
    }

    let result = injector
        .inject_memories(&ctx, args.strategy.as_deref())
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Strategy: {} (position: {})",
            result.strategy.name, result.strategy.parameters.injection_position
        );
        println!(
            "Session hooks: {}  Turn hooks: {}",
            session.continuity_hooks.len(),
            result.triggered_hooks.len()
        );
        println!(
            "Injected {} of {} memories, {} tokens ({:.0}% of budget)",
            result.injected_memories.len(),
            result.metadata.memories_considered,
            result.total_tokens,
            result.metadata.token_efficiency * 100.0
        );
        println!();
        if result.injection_context.is_empty() {
            println!("(nothing to inject)");
        } else {
            println!("{}", result.injection_context);
        }
    }

    if args.end {
        if let Some(summary) = injector.end_session(&args.session).await? {
            if !args.json {
                println!();
                println!("Session summary stored as {}", summary.id);
            }
        }
    }

    Ok(())
}
