//! Built-in scenes and shortcut phrases
//!
//! A scene is a named batch of device intents executed through the same
//! resolution pipeline as typed commands. Shortcut phrases ("gm",
//! "leaving") map straight to a scene before any parsing happens.

use crate::core::types::{Action, Domain, TARGET_ALL};
use serde::{Deserialize, Serialize};

/// One step of a scene: an action against a domain-scoped target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneStep {
    pub action: Action,
    pub domain: Domain,
    /// Room search phrase, or "all"
    pub target: String,
    /// Numeric payload for set_temperature steps
    #[serde(default)]
    pub value: Option<f64>,
}

impl SceneStep {
    fn new(action: Action, domain: Domain, target: &str) -> Self {
        Self {
            action,
            domain,
            target: target.to_string(),
            value: None,
        }
    }

    fn temperature(target: &str, degrees: f64) -> Self {
        Self {
            action: Action::SetTemperature,
            domain: Domain::Climate,
            target: target.to_string(),
            value: Some(degrees),
        }
    }
}

/// A named scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    pub description: String,
    pub steps: Vec<SceneStep>,
}

/// Registry of scenes plus their utterance shortcuts
pub struct SceneManager {
    scenes: Vec<Scene>,
}

impl SceneManager {
    /// The default scene set
    pub fn builtin() -> Self {
        Self {
            scenes: vec![
                Scene {
                    name: "morning".into(),
                    description: "Morning routine - lights on, temperature up, blinds open".into(),
                    steps: vec![
                        SceneStep::new(Action::TurnOn, Domain::Light, "kitchen"),
                        SceneStep::new(Action::TurnOn, Domain::Light, "bedroom"),
                        SceneStep::temperature(TARGET_ALL, 21.0),
                        SceneStep::new(Action::Open, Domain::Cover, "bedroom"),
                        SceneStep::new(Action::Open, Domain::Cover, "living room"),
                        SceneStep::new(Action::TurnOn, Domain::Switch, "coffee"),
                    ],
                },
                Scene {
                    name: "away".into(),
                    description: "Away mode - secure home, save energy".into(),
                    steps: vec![
                        SceneStep::new(Action::TurnOff, Domain::Light, TARGET_ALL),
                        SceneStep::temperature(TARGET_ALL, 18.0),
                        SceneStep::new(Action::Lock, Domain::Lock, TARGET_ALL),
                        SceneStep::new(Action::Close, Domain::Cover, TARGET_ALL),
                    ],
                },
                Scene {
                    name: "movie".into(),
                    description: "Movie mode - dim the room, close blinds".into(),
                    steps: vec![
                        SceneStep::new(Action::TurnOff, Domain::Light, "living room"),
                        SceneStep::new(Action::Close, Domain::Cover, "living room"),
                    ],
                },
                Scene {
                    name: "night".into(),
                    description: "Night mode - lights out, lower temperature, secure home".into(),
                    steps: vec![
                        SceneStep::new(Action::TurnOff, Domain::Light, TARGET_ALL),
                        SceneStep::temperature(TARGET_ALL, 18.0),
                        SceneStep::new(Action::Lock, Domain::Lock, TARGET_ALL),
                        SceneStep::new(Action::Close, Domain::Cover, TARGET_ALL),
                    ],
                },
                Scene {
                    name: "home".into(),
                    description: "Arrival home - welcome settings".into(),
                    steps: vec![
                        SceneStep::new(Action::TurnOn, Domain::Light, "entrance"),
                        SceneStep::new(Action::TurnOn, Domain::Light, "living room"),
                        SceneStep::temperature(TARGET_ALL, 21.0),
                        SceneStep::new(Action::Unlock, Domain::Lock, "front"),
                    ],
                },
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.name == name)
    }

    pub fn list(&self) -> &[Scene] {
        &self.scenes
    }

    /// Map a whole utterance to a scene name when it is a known shortcut.
    pub fn match_shortcut(&self, text: &str) -> Option<&Scene> {
        let name = match text.trim().to_lowercase().as_str() {
            "gm" | "good morning" => "morning",
            "leaving" | "goodbye" | "bye" => "away",
            "movie mode" | "movie time" => "movie",
            "gn" | "good night" => "night",
            "i'm home" | "im home" | "i am home" => "home",
            _ => return None,
        };
        self.get(name)
    }
}
