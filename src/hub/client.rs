//! REST client for a Home-Assistant-style hub API
//!
//! Bearer-token auth, `/api/states` for snapshots, `/api/services` for
//! commands. Snapshots are fetched fresh on every call — no caching, so
//! the engine never acts on stale device state.

use crate::core::error::{HearthError, Result};
use crate::core::types::DeviceState;
use crate::hub::DeviceHub;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

/// HTTP client for the device hub
pub struct HubClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HubClient {
    /// Create a client with explicit configuration
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            token: token.into(),
        }
    }

    /// Create a client from environment variables
    ///
    /// Required: HUB_URL, HUB_TOKEN
    pub fn from_env() -> Result<Self> {
        let url =
            std::env::var("HUB_URL").map_err(|_| HearthError::Config("HUB_URL not set".into()))?;
        let token = std::env::var("HUB_TOKEN")
            .map_err(|_| HearthError::Config("HUB_TOKEN not set".into()))?;
        Ok(Self::new(url, token))
    }

    /// Probe the hub API root; logs and returns false on any failure
    pub async fn test_connection(&self) -> bool {
        let url = format!("{}/api/", self.base_url);
        match self.client.get(&url).bearer_auth(&self.token).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("Connected to hub at {}", self.base_url);
                true
            }
            Ok(response) => {
                tracing::error!("Hub connection failed: {}", response.status());
                false
            }
            Err(e) => {
                tracing::error!("Hub connection error: {}", e);
                false
            }
        }
    }

    /// Fetch the state of one entity; None when the hub doesn't know it
    pub async fn fetch_state(&self, entity_id: &str) -> Result<Option<DeviceState>> {
        let url = format!("{}/api/states/{}", self.base_url, entity_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| HearthError::Hub(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!("Entity not found: {}", entity_id);
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(HearthError::Hub(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        let state: ApiState = response
            .json()
            .await
            .map_err(|e| HearthError::Hub(e.to_string()))?;
        Ok(Some(state.into()))
    }

    /// All entities whose id carries the given namespace prefix
    pub async fn entities_by_domain(&self, domain: &str) -> Result<Vec<DeviceState>> {
        let prefix = format!("{}.", domain);
        let states = self.fetch_all_states().await?;
        Ok(states
            .into_iter()
            .filter(|s| s.entity_id.starts_with(&prefix))
            .collect())
    }

    pub async fn turn_on(&self, entity_id: &str) -> bool {
        self.call_entity(entity_id, "turn_on", None).await
    }

    pub async fn turn_off(&self, entity_id: &str) -> bool {
        self.call_entity(entity_id, "turn_off", None).await
    }

    pub async fn toggle(&self, entity_id: &str) -> bool {
        self.call_entity(entity_id, "toggle", None).await
    }

    pub async fn set_temperature(&self, entity_id: &str, temperature: f64) -> bool {
        self.call_service(
            "climate",
            "set_temperature",
            entity_id,
            Some(json!({ "temperature": temperature })),
        )
        .await
    }

    pub async fn lock(&self, entity_id: &str) -> bool {
        self.call_service("lock", "lock", entity_id, None).await
    }

    pub async fn unlock(&self, entity_id: &str) -> bool {
        self.call_service("lock", "unlock", entity_id, None).await
    }

    pub async fn open_cover(&self, entity_id: &str) -> bool {
        self.call_service("cover", "open_cover", entity_id, None)
            .await
    }

    pub async fn close_cover(&self, entity_id: &str) -> bool {
        self.call_service("cover", "close_cover", entity_id, None)
            .await
    }

    /// Call a service in the entity's own namespace
    async fn call_entity(&self, entity_id: &str, service: &str, payload: Option<Value>) -> bool {
        let Some(domain) = entity_id.split('.').next().filter(|d| !d.is_empty()) else {
            tracing::error!("Malformed entity id: {}", entity_id);
            return false;
        };
        let domain = domain.to_string();
        self.call_service(&domain, service, entity_id, payload).await
    }
}

impl DeviceHub for HubClient {
    async fn fetch_all_states(&self) -> Result<Vec<DeviceState>> {
        let url = format!("{}/api/states", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| HearthError::Hub(e.to_string()))?;

        if !response.status().is_success() {
            return Err(HearthError::Hub(format!(
                "GET /api/states returned {}",
                response.status()
            )));
        }

        let states: Vec<ApiState> = response
            .json()
            .await
            .map_err(|e| HearthError::Hub(e.to_string()))?;
        tracing::debug!("Retrieved {} states from hub", states.len());
        Ok(states.into_iter().map(DeviceState::from).collect())
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        entity_id: &str,
        payload: Option<Value>,
    ) -> bool {
        let url = format!("{}/api/services/{}/{}", self.base_url, domain, service);

        let mut body = match payload {
            Some(Value::Object(map)) => map,
            Some(other) => {
                tracing::error!("Service payload must be a JSON object, got {}", other);
                return false;
            }
            None => serde_json::Map::new(),
        };
        body.insert("entity_id".into(), Value::String(entity_id.into()));

        match self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&Value::Object(body))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                tracing::info!("Service called: {}.{} for {}", domain, service, entity_id);
                true
            }
            Ok(response) => {
                tracing::error!(
                    "Service call {}.{} failed: {}",
                    domain,
                    service,
                    response.status()
                );
                false
            }
            Err(e) => {
                tracing::error!("Error calling service {}.{}: {}", domain, service, e);
                false
            }
        }
    }
}

// Hub wire format: friendly name nested under attributes
#[derive(Deserialize)]
struct ApiState {
    entity_id: String,
    state: String,
    #[serde(default)]
    attributes: ApiAttributes,
}

#[derive(Deserialize, Default)]
struct ApiAttributes {
    #[serde(default)]
    friendly_name: Option<String>,
}

impl From<ApiState> for DeviceState {
    fn from(raw: ApiState) -> Self {
        DeviceState {
            entity_id: raw.entity_id,
            state: raw.state,
            friendly_name: raw.attributes.friendly_name.unwrap_or_default(),
        }
    }
}
