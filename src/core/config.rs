//! Engine configuration with documented policies
//!
//! The deliberately lossy heuristics of the resolution engine (domain
//! guessing, filler stripping, permissive matching) are exposed here as
//! data, so accuracy can be tuned without touching control flow.

use crate::core::error::{HearthError, Result};
use crate::core::types::Domain;
use serde::{Deserialize, Serialize};

/// How the resolver compares a target phrase against device ids and names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Case-insensitive substring containment.
    ///
    /// Permissive on purpose: "bedroom" must match "bedroom lamp 1", so
    /// false positives are preferred over false negatives.
    #[default]
    Substring,
    /// Target must be a prefix of the identifier or display name
    Prefix,
    /// Exact equality after case folding
    Exact,
}

/// One ranked keyword set for domain inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainKeywords {
    pub domain: Domain,
    pub keywords: Vec<String>,
}

/// Configuration for the command resolution engine
///
/// Constructed once and passed by reference into the components that need
/// it. There is no global accessor: collaborators receive their
/// dependencies at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === DOMAIN INFERENCE ===
    /// Ranked keyword sets tested in order; the first set containing a
    /// word of the target phrase wins.
    ///
    /// Order matters: "garage door light" should classify as light only if
    /// light keywords outrank cover keywords, so keep the ranking stable
    /// when extending the lists.
    pub domain_keywords: Vec<DomainKeywords>,

    /// Domain assumed when no keyword set matches.
    ///
    /// This is a guess, not an empty result: most commands concern
    /// lighting, and a null domain would force a full-snapshot scan on
    /// every request.
    pub default_domain: Domain,

    // === TARGET NORMALIZATION ===
    /// Words stripped from a target phrase before device matching:
    /// articles, politeness words, and appliance-class nouns.
    ///
    /// Expanding this list is the primary maintenance lever for parser
    /// accuracy. Entries must be lowercase.
    pub filler_words: Vec<String>,

    /// Normalized phrases that mean "every candidate", beyond the "all"
    /// sentinel itself. Entries must be lowercase.
    pub everything_synonyms: Vec<String>,

    // === RESOLUTION ===
    pub match_strategy: MatchStrategy,

    // === FALLBACK ===
    /// Maximum candidate device labels enumerated in the fallback prompt.
    ///
    /// Bounds prompt size against unbounded device inventories.
    pub candidate_cap: usize,

    /// Daily budget of model calls; an exhausted budget behaves as a
    /// disabled model.
    pub max_daily_llm_calls: u32,

    // === RATE LIMITING ===
    /// Maximum turns per user inside the sliding window
    pub rate_limit_max_requests: usize,
    /// Sliding window length in seconds
    pub rate_limit_window_secs: u64,

    // === CLIMATE GUARD ===
    /// Lowest settable temperature, degrees Celsius
    pub min_temperature: f64,
    /// Highest settable temperature, degrees Celsius
    pub max_temperature: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            domain_keywords: default_domain_keywords(),
            default_domain: Domain::Light,
            filler_words: to_strings(&[
                "the", "my", "a", "an", "all", "in", "of", "please", "light", "lights", "lamp",
                "lamps", "bulb", "bulbs", "switch", "switches", "plug", "outlet", "thermostat",
                "temperature", "temp", "fan", "fans",
            ]),
            everything_synonyms: to_strings(&["everything", "every", "house", "home"]),
            match_strategy: MatchStrategy::Substring,
            candidate_cap: 60,
            max_daily_llm_calls: 100,
            rate_limit_max_requests: 30,
            rate_limit_window_secs: 60,
            min_temperature: 10.0,
            max_temperature: 35.0,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| HearthError::Config(e.to_string()))?;
        config
            .validate()
            .map_err(HearthError::Config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.domain_keywords.is_empty() {
            return Err("domain_keywords must not be empty".into());
        }

        if self.candidate_cap == 0 {
            return Err("candidate_cap must be positive".into());
        }

        if self.rate_limit_window_secs == 0 || self.rate_limit_max_requests == 0 {
            return Err("rate limit window and request count must be positive".into());
        }

        if self.min_temperature >= self.max_temperature {
            return Err(format!(
                "min_temperature ({}) must be < max_temperature ({})",
                self.min_temperature, self.max_temperature
            ));
        }

        for word in self.filler_words.iter().chain(&self.everything_synonyms) {
            if word.chars().any(|c| c.is_uppercase()) {
                return Err(format!("vocabulary entry '{}' must be lowercase", word));
            }
        }

        Ok(())
    }
}

/// Keyword ranking: light -> climate -> cover -> lock -> switch -> fan.
///
/// "lock" appears only in the lock set, and cover words ("door", "window")
/// outrank it so "front door" classifies as cover while "front door lock"
/// still reaches the lock set through "lock".
fn default_domain_keywords() -> Vec<DomainKeywords> {
    vec![
        DomainKeywords {
            domain: Domain::Light,
            keywords: to_strings(&["light", "lights", "lamp", "lamps", "bulb", "bulbs"]),
        },
        DomainKeywords {
            domain: Domain::Climate,
            keywords: to_strings(&[
                "temperature",
                "thermostat",
                "climate",
                "ac",
                "heat",
                "heating",
            ]),
        },
        DomainKeywords {
            domain: Domain::Cover,
            keywords: to_strings(&[
                "blind", "blinds", "shade", "shades", "curtain", "curtains", "garage", "door",
                "window",
            ]),
        },
        DomainKeywords {
            domain: Domain::Lock,
            keywords: to_strings(&["lock", "locks", "deadbolt"]),
        },
        DomainKeywords {
            domain: Domain::Switch,
            keywords: to_strings(&["switch", "switches", "plug", "outlet", "socket"]),
        },
        DomainKeywords {
            domain: Domain::Fan,
            keywords: to_strings(&["fan", "fans"]),
        },
    ]
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_temperatures() {
        let config = EngineConfig {
            min_temperature: 30.0,
            max_temperature: 20.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_candidate_cap() {
        let config = EngineConfig {
            candidate_cap: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_uppercase_vocabulary() {
        let config = EngineConfig {
            filler_words: vec!["The".into()],
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_overrides_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            candidate_cap = 25
            match_strategy = "prefix"
            "#,
        )
        .unwrap();
        assert_eq!(config.candidate_cap, 25);
        assert_eq!(config.match_strategy, MatchStrategy::Prefix);
        // Untouched keys keep their defaults
        assert_eq!(config.default_domain, Domain::Light);
        assert!(!config.filler_words.is_empty());
    }

    #[test]
    fn test_from_toml_rejects_invalid() {
        assert!(EngineConfig::from_toml_str("candidate_cap = 0").is_err());
    }

    #[test]
    fn test_light_outranks_cover() {
        let config = EngineConfig::default();
        let light_rank = config
            .domain_keywords
            .iter()
            .position(|k| k.domain == Domain::Light)
            .unwrap();
        let cover_rank = config
            .domain_keywords
            .iter()
            .position(|k| k.domain == Domain::Cover)
            .unwrap();
        assert!(light_rank < cover_rank);
    }
}
