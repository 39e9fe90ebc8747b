//! Injection text assembly.
//!
//! Renders the sections the prompt builder splices into a prompt:
//!
//! ```text
//! [Continuity]
//! Continuing an ongoing relationship with this user. Keep earlier context in mind.
//! - Welcome back!
//!
//! [Relevant Context]
//! 1. User prefers short answers
//! 2. User is learning Rust
//! ```
//!
//! Empty sections are omitted; with nothing to say the result is `""`.

use chatty_core::hook::{ContinuityHook, HookAction};
use chatty_core::memory::MemoryEntry;

const CONTINUITY_HEADER: &str = "[Continuity]";
const CONTINUITY_PREAMBLE: &str =
    "Continuing an ongoing relationship with this user. Keep earlier context in mind.";
const CONTEXT_HEADER: &str = "[Relevant Context]";

/// Build the injection text for a turn. Memories are listed in the order
/// given.
pub fn render_injection_context(hooks: &[ContinuityHook], memories: &[MemoryEntry]) -> String {
    let mut sections: Vec<String> = Vec::with_capacity(2);

    if !hooks.is_empty() {
        let mut section = format!("{CONTINUITY_HEADER}\n{CONTINUITY_PREAMBLE}");
        for hook in hooks {
            if let HookAction::Message { text } = &hook.action {
                section.push_str(&format!("\n- {text}"));
            }
        }
        sections.push(section);
    }

    if !memories.is_empty() {
        let lines: Vec<String> = memories
            .iter()
            .enumerate()
            .map(|(i, m)| format!("{}. {}", i + 1, m.content))
            .collect();
        sections.push(format!("{CONTEXT_HEADER}\n{}", lines.join("\n")));
    }

    sections.join("\n\n")
}
