//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token.
//! Ledgers use this to fill in `token_count` when the writer did not
//! supply one. Consumers treat the stored count as opaque.

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }
    u32::try_from(text.len().div_ceil(4)).unwrap_or(u32::MAX)
}
