//! Turn orchestration
//!
//! One user turn flows through an explicit state machine:
//! Parse -> Resolve -> (empty? -> Fallback -> Resolve retry) -> Execute ->
//! Report. The Fallback state is reachable only from Parse and the first
//! Resolve, and always transitions to a retried Resolve, so a second
//! fallback in the same turn is unrepresentable.
//!
//! Every failure is converted into a user-visible outcome at this
//! boundary; nothing propagates to the transport layer, and a failed turn
//! never corrupts state for the next one.

use crate::audit::AuditSink;
use crate::command::resolver::DeviceResolver;
use crate::core::config::EngineConfig;
use crate::core::types::{Action, DeviceState, Domain, ExecutionOutcome, Intent, TARGET_ALL};
use crate::hub::DeviceHub;
use crate::limiter::RateLimiter;
use crate::llm::{CommandModel, HomeContext};
use crate::nlu::IntentParser;
use crate::reply::ReplyChannel;
use crate::report::{format_device_list, status_dashboard};
use crate::scenes::{Scene, SceneManager};
use serde_json::json;
use std::sync::Mutex;

/// Most devices listed in a status reply before truncation
const STATUS_LIST_MAX: usize = 15;

/// States of the per-turn resolution machine
enum TurnPhase {
    Parse,
    Resolve {
        intent: Intent,
        retried: bool,
    },
    /// `failed_target` carries the target of the resolution attempt that
    /// sent us here, for the terminal message when the model has nothing.
    /// `snapshot` reuses that attempt's snapshot for candidate enumeration,
    /// keeping a turn at two fetches; the retry resolve still fetches fresh.
    Fallback {
        failed_target: Option<String>,
        snapshot: Option<Vec<DeviceState>>,
    },
    Execute {
        intent: Intent,
        matches: Vec<DeviceState>,
    },
}

/// Terminal outcome of one user turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Understood and executed, fully or partially
    Executed(ExecutionOutcome),
    /// Status query answered without service calls
    Status { report: String },
    /// Greeting answered with the dashboard (plus optional commentary)
    Greeting { message: String },
    /// Scene shortcut executed
    Scene {
        name: String,
        executed: usize,
        failed: usize,
    },
    /// Understood, but no device matched the target
    NoDevices { target: String },
    /// Neither the rules nor the model produced an intent
    NotUnderstood,
    /// Guard rejected the command before execution
    Rejected { reason: String },
    /// The user is over their sliding-window budget
    RateLimited,
    /// The hub could not be reached for a snapshot
    HubUnavailable,
}

impl TurnOutcome {
    /// User-visible confirmation text
    pub fn render(&self) -> String {
        match self {
            TurnOutcome::Executed(outcome) => {
                let icon = if outcome.any_success() { "✅" } else { "❌" };
                let target = if outcome.target_label == TARGET_ALL {
                    String::new()
                } else {
                    format!(" for {}", outcome.target_label)
                };
                format!(
                    "{} {} {}/{} device(s){}",
                    icon,
                    action_phrase(&outcome.action),
                    outcome.succeeded,
                    outcome.attempted,
                    target
                )
            }
            TurnOutcome::Status { report } => report.clone(),
            TurnOutcome::Greeting { message } => message.clone(),
            TurnOutcome::Scene {
                name,
                executed,
                failed,
            } => {
                let mut msg = format!("✅ Scene '{}' activated: {} action(s) executed", name, executed);
                if *failed > 0 {
                    msg.push_str(&format!(", {} failed", failed));
                }
                msg
            }
            TurnOutcome::NoDevices { target } => {
                format!("❌ No matching devices found for '{}'", target)
            }
            TurnOutcome::NotUnderstood => "I'm not sure what you want me to do. Try:\n\
                 • 'turn on bedroom lights'\n\
                 • 'set temperature to 21'\n\
                 • 'gm' for the morning routine"
                .into(),
            TurnOutcome::Rejected { reason } => format!("⚠️ {}", reason),
            TurnOutcome::RateLimited => "⏳ Too many requests, give me a moment.".into(),
            TurnOutcome::HubUnavailable => {
                "❌ Error reaching the home hub. Is it online?".into()
            }
        }
    }

    /// Audit category for this outcome
    pub fn category(&self) -> &'static str {
        match self {
            TurnOutcome::Status { .. } => "status",
            TurnOutcome::Greeting { .. } => "greeting",
            TurnOutcome::Scene { .. } => "scene",
            TurnOutcome::RateLimited => "rate_limit",
            _ => "natural_language",
        }
    }

    /// Success flag for the audit entry
    pub fn is_success(&self) -> bool {
        match self {
            TurnOutcome::Executed(outcome) => outcome.any_success(),
            TurnOutcome::Status { .. } | TurnOutcome::Greeting { .. } => true,
            TurnOutcome::Scene { executed, failed, .. } => *executed > 0 || *failed == 0,
            _ => false,
        }
    }
}

/// Ties parser, resolver, fallback, and execution together.
///
/// All collaborators are injected at construction time; the orchestrator
/// itself holds no connection state beyond the rate limiter.
pub struct Orchestrator<'a, H, M, A> {
    config: &'a EngineConfig,
    hub: &'a H,
    model: &'a M,
    audit: &'a A,
    scenes: SceneManager,
    limiter: Mutex<RateLimiter>,
}

impl<'a, H, M, A> Orchestrator<'a, H, M, A>
where
    H: DeviceHub,
    M: CommandModel,
    A: AuditSink,
{
    pub fn new(config: &'a EngineConfig, hub: &'a H, model: &'a M, audit: &'a A) -> Self {
        Self {
            config,
            hub,
            model,
            audit,
            scenes: SceneManager::builtin(),
            limiter: Mutex::new(RateLimiter::new(
                config.rate_limit_max_requests,
                config.rate_limit_window_secs,
            )),
        }
    }

    /// Process one turn and send the outcome through the reply channel.
    pub async fn respond<R: ReplyChannel>(
        &self,
        user_id: u64,
        utterance: &str,
        reply: &R,
    ) -> crate::core::error::Result<TurnOutcome> {
        let outcome = self.handle_turn(user_id, utterance).await;
        reply.send_text(&outcome.render()).await?;
        self.audit
            .log_command(user_id, utterance, outcome.category(), outcome.is_success());
        Ok(outcome)
    }

    /// Process one turn to a terminal outcome. Never returns an error:
    /// collaborator failures become outcomes here.
    pub async fn handle_turn(&self, user_id: u64, utterance: &str) -> TurnOutcome {
        let allowed = self
            .limiter
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_allowed(user_id);
        if !allowed {
            tracing::warn!("Rate limited user {}", user_id);
            return TurnOutcome::RateLimited;
        }

        let text = utterance.trim();

        if let Some(scene) = self.scenes.match_shortcut(text) {
            let scene = scene.clone();
            return self.activate_scene(&scene).await;
        }

        if is_greeting(text) {
            return self.greet(text).await;
        }

        self.run_pipeline(text).await
    }

    /// The Parse -> Resolve -> Fallback -> Execute machine.
    async fn run_pipeline(&self, text: &str) -> TurnOutcome {
        let parser = IntentParser::new(self.config);
        let resolver = DeviceResolver::new(self.config);

        let mut phase = TurnPhase::Parse;
        loop {
            phase = match phase {
                TurnPhase::Parse => match parser.parse(text) {
                    Some(intent) => {
                        tracing::debug!(?intent, "Rule parser produced intent");
                        TurnPhase::Resolve {
                            intent,
                            retried: false,
                        }
                    }
                    None if self.model.enabled() => TurnPhase::Fallback {
                        failed_target: None,
                        snapshot: None,
                    },
                    None => return TurnOutcome::NotUnderstood,
                },

                TurnPhase::Resolve { intent, retried } => {
                    // Fresh snapshot for every resolution attempt
                    let snapshot = match self.hub.fetch_all_states().await {
                        Ok(snapshot) => snapshot,
                        Err(e) => {
                            tracing::error!("Snapshot fetch failed: {}", e);
                            return TurnOutcome::HubUnavailable;
                        }
                    };

                    let target = intent.target_or_all().to_string();
                    let matches = resolver.resolve(intent.domain, &target, &snapshot);
                    if matches.is_empty() {
                        let wants_everything = target == TARGET_ALL;
                        if !retried && !wants_everything && self.model.enabled() {
                            TurnPhase::Fallback {
                                failed_target: Some(target),
                                snapshot: Some(snapshot),
                            }
                        } else {
                            return TurnOutcome::NoDevices { target };
                        }
                    } else {
                        TurnPhase::Execute { intent, matches }
                    }
                }

                TurnPhase::Fallback {
                    failed_target,
                    snapshot,
                } => {
                    match self.consult_model(text, snapshot).await {
                        Some(intent) => {
                            tracing::debug!(?intent, "Fallback model produced intent");
                            TurnPhase::Resolve {
                                intent,
                                retried: true,
                            }
                        }
                        // Model disabled mid-flight, over budget, failed, or
                        // malformed: all equal to "fallback produced nothing"
                        None => match failed_target {
                            Some(target) => return TurnOutcome::NoDevices { target },
                            None => return TurnOutcome::NotUnderstood,
                        },
                    }
                }

                TurnPhase::Execute { intent, matches } => {
                    return self.execute_turn(&intent, &matches).await;
                }
            };
        }
    }

    /// Ask the model for an intent; any failure is None.
    async fn consult_model(
        &self,
        text: &str,
        snapshot: Option<Vec<DeviceState>>,
    ) -> Option<Intent> {
        let snapshot = match snapshot {
            Some(snapshot) => snapshot,
            None => match self.hub.fetch_all_states().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::error!("Snapshot fetch for fallback context failed: {}", e);
                    return None;
                }
            },
        };
        let context = HomeContext::from_snapshot(&snapshot, self.config.candidate_cap);
        match self.model.analyze(text, &context).await {
            Ok(intent) => intent,
            Err(e) => {
                tracing::error!("Fallback analysis errored: {}", e);
                None
            }
        }
    }

    async fn execute_turn(&self, intent: &Intent, matches: &[DeviceState]) -> TurnOutcome {
        let target_label = intent.target_or_all().to_string();

        if intent.action.is_query() {
            return TurnOutcome::Status {
                report: format_device_list(matches, STATUS_LIST_MAX),
            };
        }

        let value = if intent.action == Action::SetTemperature {
            match self.parse_temperature(intent.value.as_deref()) {
                Ok(v) => Some(v),
                Err(reason) => return TurnOutcome::Rejected { reason },
            }
        } else {
            None
        };

        let outcome = self
            .execute_batch(intent.action, value, matches, &target_label)
            .await;
        TurnOutcome::Executed(outcome)
    }

    /// Fire the mapped service call on every matched device. A failed call
    /// does not abort the batch; partial success is expected.
    async fn execute_batch(
        &self,
        action: Action,
        value: Option<f64>,
        devices: &[DeviceState],
        target_label: &str,
    ) -> ExecutionOutcome {
        let mut succeeded = 0;
        for device in devices {
            let Some(service) = service_for(action, device.domain()) else {
                continue;
            };
            let Some(service_domain) = device.entity_id.split('.').next().filter(|d| !d.is_empty())
            else {
                tracing::warn!("Skipping malformed entity id: {}", device.entity_id);
                continue;
            };
            let payload = value.map(|v| json!({ "temperature": v }));
            if self
                .hub
                .call_service(service_domain, service, &device.entity_id, payload)
                .await
            {
                succeeded += 1;
            }
        }

        ExecutionOutcome {
            attempted: devices.len(),
            succeeded,
            action: action.as_str().into(),
            target_label: target_label.into(),
        }
    }

    fn parse_temperature(&self, raw: Option<&str>) -> std::result::Result<f64, String> {
        let raw = raw.ok_or_else(|| "set_temperature needs a numeric value".to_string())?;
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not a valid temperature", raw))?;
        if value < self.config.min_temperature || value > self.config.max_temperature {
            return Err(format!(
                "Temperature must be between {}°C and {}°C",
                self.config.min_temperature, self.config.max_temperature
            ));
        }
        Ok(value)
    }

    /// Run every step of a scene against one fresh snapshot. Steps whose
    /// hardware doesn't exist are skipped, not failed.
    async fn activate_scene(&self, scene: &Scene) -> TurnOutcome {
        tracing::info!("Activating scene '{}'", scene.name);
        let resolver = DeviceResolver::new(self.config);
        let snapshot = match self.hub.fetch_all_states().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("Snapshot fetch for scene failed: {}", e);
                return TurnOutcome::HubUnavailable;
            }
        };

        let mut executed = 0;
        let mut failed = 0;
        for step in &scene.steps {
            let matches = resolver.resolve_in_domain(step.domain, &step.target, &snapshot);
            if matches.is_empty() {
                continue;
            }
            let outcome = self
                .execute_batch(step.action, step.value, &matches, &step.target)
                .await;
            executed += outcome.succeeded;
            failed += outcome.attempted - outcome.succeeded;
        }

        TurnOutcome::Scene {
            name: scene.name.clone(),
            executed,
            failed,
        }
    }

    /// Greeting flow: dashboard first, then one line of model commentary
    /// when available. Commentary failure degrades to the dashboard alone.
    async fn greet(&self, text: &str) -> TurnOutcome {
        let snapshot = match self.hub.fetch_all_states().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("Snapshot fetch for greeting failed: {}", e);
                return TurnOutcome::HubUnavailable;
            }
        };

        let mut message = status_dashboard(&snapshot);
        if self.model.enabled() {
            let context = HomeContext::from_snapshot(&snapshot, self.config.candidate_cap);
            if let Ok(Some(comment)) = self.model.chat(text, &context).await {
                message.push('\n');
                message.push_str(&comment);
            }
        }

        TurnOutcome::Greeting { message }
    }
}

/// Map (requested action, device's own domain) to the hub service name.
/// None means the action needs no service call.
fn service_for(action: Action, device_domain: Option<Domain>) -> Option<&'static str> {
    match action {
        Action::TurnOn | Action::Open | Action::Unlock => Some(match device_domain {
            Some(Domain::Cover) => "open_cover",
            Some(Domain::Lock) => "unlock",
            _ => "turn_on",
        }),
        Action::TurnOff | Action::Close | Action::Lock => Some(match device_domain {
            Some(Domain::Cover) => "close_cover",
            Some(Domain::Lock) => "lock",
            _ => "turn_off",
        }),
        Action::SetTemperature => Some("set_temperature"),
        Action::Status => None,
    }
}

fn is_greeting(text: &str) -> bool {
    matches!(
        text.to_lowercase().trim_end_matches(['!', '.', '?']),
        "hi" | "hello" | "hey" | "hiya" | "good afternoon" | "good evening"
    )
}

fn action_phrase(action: &str) -> &str {
    match action {
        "turn_on" => "Turned on",
        "turn_off" => "Turned off",
        "open" => "Opened",
        "close" => "Closed",
        "lock" => "Locked",
        "unlock" => "Unlocked",
        "set_temperature" => "Set temperature on",
        other => other,
    }
}
