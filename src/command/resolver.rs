//! Device resolution - matches (domain, target) against a live snapshot
//!
//! The domain is a hint, not a hard constraint: an empty domain filter
//! falls back to the whole snapshot. Matching is permissive by default
//! (substring), because a stricter match starves the common case of
//! partial names ("bedroom" matching "bedroom lamp 1").

use crate::core::config::{EngineConfig, MatchStrategy};
use crate::core::types::{DeviceState, Domain, TARGET_ALL};

/// Matches a normalized target + domain hint against a device snapshot
pub struct DeviceResolver<'a> {
    config: &'a EngineConfig,
}

impl<'a> DeviceResolver<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Resolve to the set of matching devices.
    ///
    /// An empty result is the fallback trigger, not a terminal failure.
    pub fn resolve(
        &self,
        domain: Option<Domain>,
        target: &str,
        snapshot: &[DeviceState],
    ) -> Vec<DeviceState> {
        let pool = self.domain_pool(domain, snapshot);
        self.filter_target(pool, target)
    }

    /// Like `resolve`, but the domain is a hard constraint: no fallback to
    /// the unfiltered snapshot. Scene steps declare their domain and must
    /// never spill onto unrelated devices.
    pub fn resolve_in_domain(
        &self,
        domain: Domain,
        target: &str,
        snapshot: &[DeviceState],
    ) -> Vec<DeviceState> {
        let pool: Vec<&DeviceState> = snapshot
            .iter()
            .filter(|s| s.domain() == Some(domain))
            .collect();
        self.filter_target(pool, target)
    }

    fn filter_target(&self, pool: Vec<&DeviceState>, target: &str) -> Vec<DeviceState> {
        if self.is_everything(target) {
            return pool.into_iter().cloned().collect();
        }

        let needle = target.to_lowercase();
        pool.into_iter()
            .filter(|device| self.matches(device, &needle))
            .cloned()
            .collect()
    }

    /// Domain prefix filter, falling back to the unfiltered snapshot when
    /// the domain yields nothing.
    fn domain_pool<'s>(
        &self,
        domain: Option<Domain>,
        snapshot: &'s [DeviceState],
    ) -> Vec<&'s DeviceState> {
        let Some(domain) = domain else {
            return snapshot.iter().collect();
        };

        let filtered: Vec<&DeviceState> = snapshot
            .iter()
            .filter(|s| s.domain() == Some(domain))
            .collect();

        if filtered.is_empty() {
            snapshot.iter().collect()
        } else {
            filtered
        }
    }

    fn is_everything(&self, target: &str) -> bool {
        let target = target.to_lowercase();
        target == TARGET_ALL
            || self
                .config
                .everything_synonyms
                .iter()
                .any(|s| s == &target)
    }

    fn matches(&self, device: &DeviceState, needle: &str) -> bool {
        let id = device.entity_id.to_lowercase();
        let name = device.friendly_name.to_lowercase();

        match self.config.match_strategy {
            MatchStrategy::Substring => id.contains(needle) || name.contains(needle),
            MatchStrategy::Prefix => {
                // Compare against the identifier part, not the namespace
                let ident = id.split('.').nth(1).unwrap_or(&id);
                ident.starts_with(needle) || name.starts_with(needle)
            }
            MatchStrategy::Exact => {
                let ident = id.split('.').nth(1).unwrap_or(&id);
                ident == needle || name == needle
            }
        }
    }
}
