//! Heuristic domain inference from a free-text target phrase
//!
//! Tests the configured keyword sets in ranking order against the phrase's
//! tokens; the first set with a hit wins. A phrase with no hits gets the
//! configured default domain (light) — a guess, not an empty result, since
//! a null domain would force a full-snapshot scan on every request.

use crate::core::config::EngineConfig;
use crate::core::types::Domain;

/// Guess the device domain for a raw (un-normalized) target phrase.
pub fn infer_domain(phrase: &str, config: &EngineConfig) -> Domain {
    let tokens: Vec<String> = phrase
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| matches!(c, '?' | '.' | ',' | '!'))
                .to_lowercase()
        })
        .collect();

    for set in &config.domain_keywords {
        if set
            .keywords
            .iter()
            .any(|keyword| tokens.iter().any(|t| t == keyword))
        {
            return set.domain;
        }
    }

    config.default_domain
}
