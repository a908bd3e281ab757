//! Home context for LLM prompts
//!
//! A bounded summary of the device snapshot that helps the model map a
//! free-text target onto a real device. The candidate enumeration is
//! capped so an unpredictable inventory can't blow past model input
//! limits.

use crate::core::types::{DeviceState, Domain};

/// Snapshot summary handed to the fallback model
pub struct HomeContext {
    /// Total entities in the snapshot
    pub device_count: usize,
    /// Lights currently on / total lights
    pub lights_on: usize,
    pub lights_total: usize,
    /// Candidate device labels, capped; "entity_id (friendly name)"
    pub candidates: Vec<String>,
    /// True when the candidate list was truncated by the cap
    pub truncated: bool,
}

impl HomeContext {
    /// Build a context from a device snapshot, enumerating at most `cap`
    /// candidate labels.
    pub fn from_snapshot(snapshot: &[DeviceState], cap: usize) -> Self {
        let lights_total = snapshot
            .iter()
            .filter(|s| s.domain() == Some(Domain::Light))
            .count();
        let lights_on = snapshot
            .iter()
            .filter(|s| s.domain() == Some(Domain::Light) && s.state == "on")
            .count();

        // Only controllable domains make useful candidates
        let controllable: Vec<&DeviceState> = snapshot
            .iter()
            .filter(|s| s.domain().is_some())
            .collect();
        let truncated = controllable.len() > cap;
        let candidates = controllable
            .iter()
            .take(cap)
            .map(|s| {
                if s.friendly_name.is_empty() {
                    s.entity_id.clone()
                } else {
                    format!("{} ({})", s.entity_id, s.friendly_name)
                }
            })
            .collect();

        Self {
            device_count: snapshot.len(),
            lights_on,
            lights_total,
            candidates,
            truncated,
        }
    }

    /// Create an empty context for testing
    pub fn empty() -> Self {
        Self {
            device_count: 0,
            lights_on: 0,
            lights_total: 0,
            candidates: Vec::new(),
            truncated: false,
        }
    }

    /// Generate a text summary for prompt construction
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Devices known to the hub: {}\n", self.device_count));
        s.push_str(&format!(
            "Lights on: {}/{}\n",
            self.lights_on, self.lights_total
        ));

        if !self.candidates.is_empty() {
            s.push_str("\nControllable devices:\n");
            for label in &self.candidates {
                s.push_str(&format!("- {}\n", label));
            }
            if self.truncated {
                s.push_str("(list truncated)\n");
            }
        }

        s
    }
}
