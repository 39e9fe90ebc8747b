//! `chatty remember`: Store a memory in the ledger.

use chatty_core::memory::{MemoryDetail, MemoryKind, NewMemory};

use super::{CliResult, load_config, open_ledger};

pub struct RememberArgs {
    pub user: String,
    pub session: String,
    pub content: String,
    pub kind: String,
    pub category: Option<String>,
    pub importance: f32,
    pub relevance: f32,
    pub tags: Vec<String>,
}

pub async fn remember(args: RememberArgs) -> CliResult {
    let config = load_config()?;
    let kind: MemoryKind = args.kind.parse()?;
    let ledger = open_ledger(&config);

    let entry = ledger
        .create_memory(NewMemory {
            user_id: args.user,
            session_id: args.session,
            kind,
            category: args.category.unwrap_or_else(|| kind.to_string()),
            content: args.content,
            importance: args.importance,
            relevance: args.relevance,
            token_count: None,
            tags: args.tags.into_iter().filter(|t| !t.is_empty()).collect(),
            detail: MemoryDetail::General,
        })
        .await?;

    println!("Stored memory {}", entry.id);
    println!(
        "  kind={} importance={:.2} relevance={:.2} tokens={}",
        entry.kind,
        entry.importance(),
        entry.relevance(),
        entry.token_count()
    );
    Ok(())
}
