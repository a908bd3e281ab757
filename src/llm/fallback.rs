//! LLM fallback: utterance + candidate devices -> validated Intent
//!
//! Invoked when deterministic parsing or resolution comes up empty. The
//! model returns JSON matching the Intent schema; anything malformed is
//! discarded rather than propagated. The orchestrator's state machine
//! guarantees at most one invocation per turn.

use crate::core::error::Result;
use crate::core::types::Intent;
use crate::llm::client::LlmClient;
use crate::llm::context::HomeContext;

/// Model-backed command analysis, feature-flagged.
///
/// `analyze` and `chat` must not be called when `enabled` is false; a
/// disabled model, a failed call, and a malformed response all look the
/// same to callers: nothing.
#[allow(async_fn_in_trait)]
pub trait CommandModel {
    fn enabled(&self) -> bool;

    /// Best-effort structured intent for an utterance; None when the model
    /// can't produce a valid one.
    async fn analyze(&self, utterance: &str, context: &HomeContext) -> Result<Option<Intent>>;

    /// Free-form one-shot reply (greeting commentary, status phrasing).
    async fn chat(&self, prompt: &str, context: &HomeContext) -> Result<Option<String>>;
}

/// Adapter wrapping an optional LlmClient into the CommandModel interface
pub struct FallbackAdapter {
    client: Option<LlmClient>,
}

impl FallbackAdapter {
    pub fn new(client: Option<LlmClient>) -> Self {
        if client.is_none() {
            tracing::warn!("LLM fallback disabled (no client configured)");
        }
        Self { client }
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    /// The client, if present and within its daily budget
    fn usable_client(&self) -> Option<&LlmClient> {
        let client = self.client.as_ref()?;
        if client.try_acquire_call() {
            Some(client)
        } else {
            None
        }
    }
}

impl CommandModel for FallbackAdapter {
    fn enabled(&self) -> bool {
        self.client.is_some()
    }

    async fn analyze(&self, utterance: &str, context: &HomeContext) -> Result<Option<Intent>> {
        let Some(client) = self.usable_client() else {
            return Ok(None);
        };

        let user_prompt = format!(
            "HOME CONTEXT:\n{}\nUSER COMMAND:\n{}\n\nParse this command into JSON:",
            context.summary(),
            utterance
        );

        let response = match client.complete(ANALYZE_SYSTEM_PROMPT, &user_prompt).await {
            Ok(text) => text,
            Err(e) => {
                // A failed model call is resolution staying empty, not a crash
                tracing::error!("Fallback analysis failed: {}", e);
                return Ok(None);
            }
        };

        Ok(parse_intent_response(&response))
    }

    async fn chat(&self, prompt: &str, context: &HomeContext) -> Result<Option<String>> {
        let Some(client) = self.usable_client() else {
            return Ok(None);
        };

        let user_prompt = format!(
            "CURRENT HOME STATE:\n{}\nUSER SAYS:\n{}",
            context.summary(),
            prompt
        );

        match client.complete(CHAT_SYSTEM_PROMPT, &user_prompt).await {
            Ok(text) => Ok(Some(text.trim().to_string())),
            Err(e) => {
                tracing::error!("Chat completion failed: {}", e);
                Ok(None)
            }
        }
    }
}

/// Extract and validate the Intent JSON from a model response.
///
/// Malformed JSON, unknown actions, and out-of-range confidence are all
/// discarded: garbage never flows downstream.
fn parse_intent_response(response: &str) -> Option<Intent> {
    let json_str = extract_json(response)?;
    let intent: Intent = match serde_json::from_str(json_str) {
        Ok(intent) => intent,
        Err(e) => {
            tracing::warn!("Discarding malformed model intent: {} - {}", e, json_str);
            return None;
        }
    };

    if let Some(confidence) = intent.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            tracing::warn!("Discarding intent with confidence {}", confidence);
            return None;
        }
    }

    Some(intent)
}

/// Extract a JSON object from an LLM response (handles surrounding text)
fn extract_json(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}

/// System prompt for command analysis
const ANALYZE_SYSTEM_PROMPT: &str = r#"You are parsing commands for a home automation assistant.
Convert the user's request into structured JSON.

AVAILABLE ACTIONS:
- turn_on / turn_off: switch devices
- open / close: covers (blinds, garage doors)
- lock / unlock: locks
- set_temperature: climate devices (requires a numeric "value")
- status: report device state, change nothing

DOMAINS: light, climate, lock, cover, switch, fan (or null if unsure)

Pick "target" so it matches one of the listed devices when possible:
a word from the device's id or name is enough. Use "all" to mean every
device in the domain.

OUTPUT FORMAT (JSON only, no explanation):
{
  "action": "turn_on|turn_off|open|close|lock|unlock|set_temperature|status",
  "domain": "light|climate|lock|cover|switch|fan" or null,
  "target": "device or room search phrase, or the word all",
  "value": "numeric value if needed, else null",
  "confidence": 0.0-1.0
}

Examples:
"turn on bedroom lights" -> {"action": "turn_on", "domain": "light", "target": "bedroom", "value": null, "confidence": 0.95}
"set living room to 21 degrees" -> {"action": "set_temperature", "domain": "climate", "target": "living room", "value": "21", "confidence": 0.9}
"is the door locked?" -> {"action": "status", "domain": "lock", "target": "door", "value": null, "confidence": 0.85}
"make it cozy in here" -> {"action": "turn_on", "domain": "light", "target": "all", "value": null, "confidence": 0.5}
"#;

/// System prompt for free-form commentary
const CHAT_SYSTEM_PROMPT: &str = r#"You are a helpful home assistant. Reply to the user in one or two
short sentences, grounded in the home state you are given. Plain text
only, no markup, no lists."#;
