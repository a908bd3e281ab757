//! Deterministic intent parsing
//!
//! An ordered list of pattern rules; the first rule whose pattern matches
//! wins, so rule order encodes priority: explicit on/off phrasing before
//! the generic "<noun> on/off" form, open/close and lock/unlock before
//! status queries. "No match" is an expected, frequent outcome — the
//! orchestrator treats it as "go straight to fallback", not as a bug.

use crate::core::config::EngineConfig;
use crate::core::types::{Action, Domain, Intent, TARGET_ALL};
use crate::nlu::domains::infer_domain;
use crate::nlu::normalize::clean_target;
use regex::Regex;
use std::sync::OnceLock;

/// Deterministic pattern matcher converting text to a candidate intent
pub struct IntentParser<'a> {
    config: &'a EngineConfig,
}

impl<'a> IntentParser<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Run the rule list against an utterance; None means no rule fired.
    pub fn parse(&self, utterance: &str) -> Option<Intent> {
        let text = utterance.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }

        // Rule 1: explicit "turn on/off <phrase>"
        if let Some(c) = turn_pattern().captures(&text) {
            let action = if &c[1] == "on" {
                Action::TurnOn
            } else {
                Action::TurnOff
            };
            return Some(self.build(action, &c[2], None, None));
        }

        // Rule 2: "set <phrase> to <number>" — always climate
        if let Some(c) = set_temperature_pattern().captures(&text) {
            return Some(self.build(
                Action::SetTemperature,
                &c[1],
                Some(Domain::Climate),
                Some(c[2].to_string()),
            ));
        }

        // Rule 3: "open/close <phrase>" — cover by construction
        if let Some(c) = open_close_pattern().captures(&text) {
            let action = if &c[1] == "open" {
                Action::Open
            } else {
                Action::Close
            };
            return Some(self.build(action, &c[2], Some(Domain::Cover), None));
        }

        // Rule 4: "lock/unlock <phrase>"
        if let Some(c) = lock_pattern().captures(&text) {
            let action = if &c[1] == "lock" {
                Action::Lock
            } else {
                Action::Unlock
            };
            return Some(self.build(action, &c[2], Some(Domain::Lock), None));
        }

        // Rule 5: status interrogatives ("what's the ...", "is the ...")
        if let Some(c) = status_pattern().captures(&text) {
            let mut intent = self.build(Action::Status, &c[1], None, None);
            let stripped = strip_state_words(intent.target_or_all());
            intent.target = Some(stripped);
            return Some(intent);
        }

        // Rule 6: generic "<noun> on/off", lowest priority
        if let Some(c) = bare_toggle_pattern().captures(&text) {
            let action = if &c[2] == "on" {
                Action::TurnOn
            } else {
                Action::TurnOff
            };
            return Some(self.build(action, &c[1], None, None));
        }

        None
    }

    fn build(
        &self,
        action: Action,
        phrase: &str,
        domain: Option<Domain>,
        value: Option<String>,
    ) -> Intent {
        let domain = domain.unwrap_or_else(|| infer_domain(phrase, self.config));
        Intent {
            action,
            domain: Some(domain),
            target: Some(clean_target(phrase, &self.config.filler_words)),
            value,
            confidence: None,
        }
    }
}

/// Drop trailing state adjectives from a status target so "front door
/// locked" searches for "front door".
fn strip_state_words(target: &str) -> String {
    let mut words: Vec<&str> = target.split(' ').collect();
    while matches!(
        words.last().copied(),
        Some("locked" | "unlocked" | "open" | "closed" | "on" | "off")
    ) {
        words.pop();
    }
    if words.is_empty() {
        TARGET_ALL.to_string()
    } else {
        words.join(" ")
    }
}

fn turn_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"turn (on|off) (?:the )?(.+)").expect("valid pattern"))
}

fn set_temperature_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"set (?:the )?(.+?) to (\d+(?:\.\d+)?)").expect("valid pattern")
    })
}

fn open_close_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(open|close) (?:the )?(.+)").expect("valid pattern"))
}

fn lock_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(lock|unlock) (?:the )?(.+)").expect("valid pattern"))
}

fn status_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:what(?:'s| is) the |is the |check the )(.+?)(?:\?|$)")
            .expect("valid pattern")
    })
}

fn bare_toggle_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+?)\s+(on|off)$").expect("valid pattern"))
}
