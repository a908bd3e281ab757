//! Target normalization: free-text phrase -> device search key
//!
//! Strips articles, politeness words, and appliance-class nouns so that
//! "turn off all lights" searches for every light instead of a device
//! literally named "lights". Pure string transforms, no allocation-heavy
//! structures.

use crate::core::types::TARGET_ALL;

/// Clean a target phrase into a search key.
///
/// Filler words are removed case-insensitively, per-word punctuation is
/// trimmed, and the remaining words are joined by single spaces. An empty
/// result becomes the "all" sentinel.
pub fn clean_target(phrase: &str, filler_words: &[String]) -> String {
    let kept: Vec<String> = phrase
        .split_whitespace()
        .filter_map(|word| {
            let trimmed = word
                .trim_matches(|c: char| matches!(c, '?' | '.' | ',' | '!'))
                .to_lowercase();
            if trimmed.is_empty() || filler_words.iter().any(|f| f == &trimmed) {
                None
            } else {
                Some(trimmed)
            }
        })
        .collect();

    if kept.is_empty() {
        TARGET_ALL.to_string()
    } else {
        kept.join(" ")
    }
}
