//! Chatty CLI, the main entry point.
//!
//! Commands:
//! - `strategies`: Show the injection strategy table
//! - `remember`: Store a memory in the ledger
//! - `inject`: Run one turn of memory injection
//! - `hook`: Create a continuity hook
//! - `ritual`: Create a session ritual
//! - `feedback`: Apply relevance feedback to a memory
//! - `config`: Print the default configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "chatty",
    about = "Chatty: memory injection and session continuity",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved injection strategy table
    Strategies,

    /// Store a memory in the ledger
    Remember {
        #[arg(short, long)]
        user: String,

        #[arg(short, long, default_value = "cli")]
        session: String,

        /// Memory text
        #[arg(short, long)]
        content: String,

        /// conversation, fact, preference, relationship, ritual or continuity
        #[arg(short, long, default_value = "fact")]
        kind: String,

        /// Free-form category (defaults to the kind)
        #[arg(long)]
        category: Option<String>,

        #[arg(long, default_value_t = 0.5)]
        importance: f32,

        #[arg(long, default_value_t = 0.5)]
        relevance: f32,

        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Start a session and inject memories for one turn
    Inject {
        #[arg(short, long)]
        user: String,

        #[arg(short, long, default_value = "cli")]
        session: String,

        #[arg(short, long)]
        topic: Option<String>,

        #[arg(short, long)]
        intent: Option<String>,

        /// The user's current message
        #[arg(short, long, default_value = "")]
        message: String,

        /// Earlier messages of the conversation, oldest first
        #[arg(long, num_args = 1..)]
        history: Vec<String>,

        /// Token budget (defaults to injection.default_max_tokens)
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Strategy name (defaults to injection.default_strategy)
        #[arg(long)]
        strategy: Option<String>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// End the session afterwards and write its summary
        #[arg(long)]
        end: bool,
    },

    /// Create a continuity hook that posts a message when triggered
    Hook {
        #[arg(short, long)]
        user: String,

        /// session-start, topic:<T>, keyword:<K> or hours:<S>-<E>
        #[arg(short, long)]
        trigger: String,

        #[arg(short, long)]
        message: String,

        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        priority: i32,
    },

    /// Create a ritual that runs when sessions start
    Ritual {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        name: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// every_session, daily or weekly
        #[arg(short, long, default_value = "every_session")]
        frequency: String,
    },

    /// Apply relevance feedback to a memory
    Feedback {
        #[arg(short, long)]
        memory: String,

        /// The memory helped
        #[arg(long)]
        helpful: bool,

        /// How well the memory fit the turn
        #[arg(long, default_value_t = 0.0)]
        context_relevance: f32,

        /// Explicit user rating
        #[arg(long, allow_negative_numbers = true)]
        user_feedback: Option<f32>,
    },

    /// Print the default configuration TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Strategies => commands::strategies::run().await?,
        Commands::Remember {
            user,
            session,
            content,
            kind,
            category,
            importance,
            relevance,
            tags,
        } => {
            commands::memory::remember(commands::memory::RememberArgs {
                user,
                session,
                content,
                kind,
                category,
                importance,
                relevance,
                tags,
            })
            .await?
        }
        Commands::Inject {
            user,
            session,
            topic,
            intent,
            message,
            history,
            max_tokens,
            strategy,
            json,
            end,
        } => {
            commands::inject::run(commands::inject::InjectArgs {
                user,
                session,
                topic,
                intent,
                message,
                history,
                max_tokens,
                strategy,
                json,
                end,
            })
            .await?
        }
        Commands::Hook {
            user,
            trigger,
            message,
            priority,
        } => commands::hook::run(&user, &trigger, message, priority).await?,
        Commands::Ritual {
            user,
            name,
            description,
            frequency,
        } => commands::ritual::run(user, name, description, &frequency).await?,
        Commands::Feedback {
            memory,
            helpful,
            context_relevance,
            user_feedback,
        } => commands::feedback::run(&memory, helpful, context_relevance, user_feedback).await?,
        Commands::Config => commands::config_cmd::show(),
    }

    Ok(())
}
