//! Core type definitions used throughout the codebase

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Device category namespace, mirroring the hub's entity id prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Light,
    Climate,
    Lock,
    Cover,
    Switch,
    Fan,
}

impl Domain {
    /// All domains the engine controls, in inference priority order
    pub const ALL: [Domain; 6] = [
        Domain::Light,
        Domain::Climate,
        Domain::Cover,
        Domain::Lock,
        Domain::Switch,
        Domain::Fan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Light => "light",
            Domain::Climate => "climate",
            Domain::Lock => "lock",
            Domain::Cover => "cover",
            Domain::Switch => "switch",
            Domain::Fan => "fan",
        }
    }

    /// Parse the namespace prefix of an entity id ("light.bedroom" -> Light)
    pub fn from_entity_id(entity_id: &str) -> Option<Domain> {
        let prefix = entity_id.split('.').next()?;
        match prefix {
            "light" => Some(Domain::Light),
            "climate" => Some(Domain::Climate),
            "lock" => Some(Domain::Lock),
            "cover" => Some(Domain::Cover),
            "switch" => Some(Domain::Switch),
            "fan" => Some(Domain::Fan),
            _ => None,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The action a user intent requests
///
/// Aliases let model output like "on"/"off" deserialize to the canonical
/// variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[serde(alias = "on")]
    TurnOn,
    #[serde(alias = "off")]
    TurnOff,
    Open,
    Close,
    Lock,
    Unlock,
    SetTemperature,
    Status,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::TurnOn => "turn_on",
            Action::TurnOff => "turn_off",
            Action::Open => "open",
            Action::Close => "close",
            Action::Lock => "lock",
            Action::Unlock => "unlock",
            Action::SetTemperature => "set_temperature",
            Action::Status => "status",
        }
    }

    /// True for actions that only read device state
    pub fn is_query(&self) -> bool {
        matches!(self, Action::Status)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured representation of a user request
///
/// Created by the parser or the fallback adapter, consumed once by the
/// orchestrator. Never mutated after creation: a retry produces a new
/// Intent rather than editing the old one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub action: Action,
    #[serde(default)]
    pub domain: Option<Domain>,
    /// Normalized search phrase, or the "all" sentinel
    #[serde(default)]
    pub target: Option<String>,
    /// Free-form value (temperature, brightness), kept as text until execution
    #[serde(default, deserialize_with = "de_opt_value")]
    pub value: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl Intent {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            domain: None,
            target: None,
            value: None,
            confidence: None,
        }
    }

    /// The target phrase, defaulting to the "all" sentinel when absent
    pub fn target_or_all(&self) -> &str {
        self.target.as_deref().unwrap_or(TARGET_ALL)
    }
}

/// Sentinel target meaning "every candidate in the domain-filtered set"
pub const TARGET_ALL: &str = "all";

/// Models return `value` as either a JSON string or a bare number
fn de_opt_value<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(f64),
        None,
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => Some(s),
        // Trim the trailing ".0" serde_json gives integral floats
        Raw::Number(n) if n.fract() == 0.0 => Some(format!("{}", n as i64)),
        Raw::Number(n) => Some(n.to_string()),
        Raw::None => None,
    })
}

/// A device record as reported by the hub
///
/// The engine reads a point-in-time snapshot per resolution attempt and
/// never caches or mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Namespaced id, "domain.identifier"
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub friendly_name: String,
}

impl DeviceState {
    pub fn new(
        entity_id: impl Into<String>,
        state: impl Into<String>,
        friendly_name: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            friendly_name: friendly_name.into(),
        }
    }

    /// The device's own domain, from its entity id prefix
    pub fn domain(&self) -> Option<Domain> {
        Domain::from_entity_id(&self.entity_id)
    }

    /// Display label: friendly name when the hub provides one
    pub fn label(&self) -> &str {
        if self.friendly_name.is_empty() {
            &self.entity_id
        } else {
            &self.friendly_name
        }
    }

    /// Whether the state string counts as "active" for display purposes
    pub fn is_active(&self) -> bool {
        matches!(self.state.as_str(), "on" | "open" | "unlocked" | "home")
    }
}

/// Result of executing one user turn, used for the confirmation message
/// and the audit entry
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub attempted: usize,
    pub succeeded: usize,
    pub action: String,
    pub target_label: String,
}

impl ExecutionOutcome {
    pub fn is_full_success(&self) -> bool {
        self.attempted > 0 && self.succeeded == self.attempted
    }

    pub fn any_success(&self) -> bool {
        self.succeeded > 0
    }
}
