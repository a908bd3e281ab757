//! Device hub interface
//!
//! The engine talks to the home-automation hub through the narrow
//! `DeviceHub` trait: a fresh snapshot fetch and a fire-and-report service
//! call. The REST implementation lives in `client`; tests substitute
//! scripted fakes.

pub mod client;

pub use client::HubClient;

use crate::core::error::Result;
use crate::core::types::DeviceState;

/// Narrow interface the resolution engine depends on.
///
/// `call_service` reports failure as `false` rather than an error: an
/// individual device failing is a counted outcome, not a fatal one.
#[allow(async_fn_in_trait)]
pub trait DeviceHub {
    /// Fetch a point-in-time snapshot of every entity state.
    async fn fetch_all_states(&self) -> Result<Vec<DeviceState>>;

    /// Invoke `domain.service` on one entity with an optional payload.
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        entity_id: &str,
        payload: Option<serde_json::Value>,
    ) -> bool;
}
