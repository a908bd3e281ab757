//! Integration tests for the command resolution engine
//!
//! Drives the orchestrator end-to-end against a scripted hub and a
//! scripted model: parse -> resolve -> fallback -> execute -> report.

use hearth::audit::AuditSink;
use hearth::command::{Orchestrator, TurnOutcome};
use hearth::core::config::EngineConfig;
use hearth::core::error::{HearthError, Result};
use hearth::core::types::{Action, DeviceState, Domain, Intent};
use hearth::hub::DeviceHub;
use hearth::llm::{CommandModel, FallbackAdapter, HomeContext};
use hearth::reply::ReplyChannel;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
struct ServiceCall {
    domain: String,
    service: String,
    entity_id: String,
    payload: Option<Value>,
}

/// Hub double: fixed snapshot, recorded calls, scriptable failures
struct MockHub {
    snapshot: Vec<DeviceState>,
    calls: Mutex<Vec<ServiceCall>>,
    failing_entities: HashSet<String>,
    fetch_count: AtomicUsize,
    fetch_fails: bool,
}

impl MockHub {
    fn new(snapshot: Vec<DeviceState>) -> Self {
        Self {
            snapshot,
            calls: Mutex::new(Vec::new()),
            failing_entities: HashSet::new(),
            fetch_count: AtomicUsize::new(0),
            fetch_fails: false,
        }
    }

    fn with_failing_entity(mut self, entity_id: &str) -> Self {
        self.failing_entities.insert(entity_id.to_string());
        self
    }

    fn unreachable() -> Self {
        let mut hub = Self::new(Vec::new());
        hub.fetch_fails = true;
        hub
    }

    fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    fn fetches(&self) -> usize {
        self.fetch_count.load(Ordering::Relaxed)
    }
}

impl DeviceHub for MockHub {
    async fn fetch_all_states(&self) -> Result<Vec<DeviceState>> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        if self.fetch_fails {
            return Err(HearthError::Hub("connection refused".into()));
        }
        Ok(self.snapshot.clone())
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        entity_id: &str,
        payload: Option<Value>,
    ) -> bool {
        self.calls.lock().unwrap().push(ServiceCall {
            domain: domain.into(),
            service: service.into(),
            entity_id: entity_id.into(),
            payload,
        });
        !self.failing_entities.contains(entity_id)
    }
}

/// Model double returning a fixed intent
struct MockModel {
    intent: Option<Intent>,
    analyze_calls: AtomicUsize,
}

impl MockModel {
    fn returning(intent: Intent) -> Self {
        Self {
            intent: Some(intent),
            analyze_calls: AtomicUsize::new(0),
        }
    }

    fn empty() -> Self {
        Self {
            intent: None,
            analyze_calls: AtomicUsize::new(0),
        }
    }

    fn analyze_count(&self) -> usize {
        self.analyze_calls.load(Ordering::Relaxed)
    }
}

impl CommandModel for MockModel {
    fn enabled(&self) -> bool {
        true
    }

    async fn analyze(&self, _utterance: &str, _context: &HomeContext) -> Result<Option<Intent>> {
        self.analyze_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.intent.clone())
    }

    async fn chat(&self, _prompt: &str, _context: &HomeContext) -> Result<Option<String>> {
        Ok(Some("All quiet at home.".into()))
    }
}

/// Reply double collecting sent messages
struct BufferReply {
    messages: Mutex<Vec<String>>,
}

impl BufferReply {
    fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl ReplyChannel for BufferReply {
    async fn send_text(&self, message: &str) -> Result<()> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// Audit double recording entries
struct RecordingAudit {
    entries: Mutex<Vec<(u64, String, String, bool)>>,
}

impl RecordingAudit {
    fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl AuditSink for RecordingAudit {
    fn log_command(&self, user_id: u64, text: &str, category: &str, success: bool) {
        self.entries
            .lock()
            .unwrap()
            .push((user_id, text.into(), category.into(), success));
    }
}

fn three_lights() -> Vec<DeviceState> {
    vec![
        DeviceState::new("light.bedroom_lamp_1", "on", "Bedroom Lamp 1"),
        DeviceState::new("light.bedroom_lamp_2", "on", "Bedroom Lamp 2"),
        DeviceState::new("light.kitchen", "off", "Kitchen Light"),
    ]
}

/// Test 1: "turn off all lights" calls turn_off on every light, on or off,
/// and reports 3/3
#[tokio::test]
async fn test_turn_off_all_lights() {
    let config = EngineConfig::default();
    let hub = MockHub::new(three_lights());
    let model = FallbackAdapter::disabled();
    let audit = RecordingAudit::new();
    let orchestrator = Orchestrator::new(&config, &hub, &model, &audit);

    let outcome = orchestrator.handle_turn(1, "turn off all lights").await;

    let calls = hub.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls
        .iter()
        .all(|c| c.domain == "light" && c.service == "turn_off"));

    match &outcome {
        TurnOutcome::Executed(result) => {
            assert_eq!(result.attempted, 3);
            assert_eq!(result.succeeded, 3);
        }
        other => panic!("expected Executed, got {:?}", other),
    }
    assert!(outcome.render().contains("3/3"));
}

/// Test 2: "set temperature to 21" hits the climate device with the
/// numeric payload and reports 1/1
#[tokio::test]
async fn test_set_temperature() {
    let config = EngineConfig::default();
    let hub = MockHub::new(vec![DeviceState::new(
        "climate.living_room",
        "heat",
        "Living Room Thermostat",
    )]);
    let model = FallbackAdapter::disabled();
    let audit = RecordingAudit::new();
    let orchestrator = Orchestrator::new(&config, &hub, &model, &audit);

    let outcome = orchestrator.handle_turn(1, "set temperature to 21").await;

    let calls = hub.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].domain, "climate");
    assert_eq!(calls[0].service, "set_temperature");
    assert_eq!(calls[0].payload, Some(json!({ "temperature": 21.0 })));
    assert!(outcome.render().contains("1/1"));
}

/// Test 3: unknown device name resolves through the model fallback
#[tokio::test]
async fn test_fallback_resolves_foreign_word() {
    let config = EngineConfig::default();
    let hub = MockHub::new(vec![DeviceState::new(
        "light.bedroom_lamp",
        "off",
        "Bedroom Lamp",
    )]);
    let model = MockModel::returning(Intent {
        action: Action::TurnOn,
        domain: Some(Domain::Light),
        target: Some("bedroom".into()),
        value: None,
        confidence: Some(0.9),
    });
    let audit = RecordingAudit::new();
    let orchestrator = Orchestrator::new(&config, &hub, &model, &audit);

    // "chambre" matches nothing deterministically
    let outcome = orchestrator.handle_turn(1, "turn on chambre").await;

    assert_eq!(model.analyze_count(), 1);
    let calls = hub.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].entity_id, "light.bedroom_lamp");
    assert_eq!(calls[0].service, "turn_on");
    assert!(matches!(outcome, TurnOutcome::Executed(_)));
}

/// Test 4: a turn performs at most two snapshot fetches even on the
/// fallback path (failed resolve reuses its snapshot for the prompt)
#[tokio::test]
async fn test_fallback_path_fetch_budget() {
    let config = EngineConfig::default();
    let hub = MockHub::new(vec![DeviceState::new(
        "light.bedroom_lamp",
        "off",
        "Bedroom Lamp",
    )]);
    let model = MockModel::returning(Intent {
        action: Action::TurnOn,
        domain: Some(Domain::Light),
        target: Some("bedroom".into()),
        value: None,
        confidence: None,
    });
    let audit = RecordingAudit::new();
    let orchestrator = Orchestrator::new(&config, &hub, &model, &audit);

    orchestrator.handle_turn(1, "turn on chambre").await;
    assert_eq!(hub.fetches(), 2);
}

/// Test 5: fallback runs at most once per turn even when the retried
/// intent also resolves empty
#[tokio::test]
async fn test_fallback_invoked_at_most_once() {
    let config = EngineConfig::default();
    let hub = MockHub::new(three_lights());
    let model = MockModel::returning(Intent {
        action: Action::TurnOn,
        domain: Some(Domain::Light),
        target: Some("greenhouse".into()),
        value: None,
        confidence: Some(0.4),
    });
    let audit = RecordingAudit::new();
    let orchestrator = Orchestrator::new(&config, &hub, &model, &audit);

    let outcome = orchestrator.handle_turn(1, "turn on the orangerie").await;

    assert_eq!(model.analyze_count(), 1);
    assert!(hub.calls().is_empty());
    match outcome {
        TurnOutcome::NoDevices { target } => assert_eq!(target, "greenhouse"),
        other => panic!("expected NoDevices, got {:?}", other),
    }
}

/// Test 6: model disabled and no rule match ends in "not understood"
/// with zero hub traffic
#[tokio::test]
async fn test_disabled_model_not_understood() {
    let config = EngineConfig::default();
    let hub = MockHub::new(three_lights());
    let model = FallbackAdapter::disabled();
    let audit = RecordingAudit::new();
    let orchestrator = Orchestrator::new(&config, &hub, &model, &audit);

    let outcome = orchestrator.handle_turn(1, "sing me a song").await;

    assert_eq!(outcome, TurnOutcome::NotUnderstood);
    assert!(hub.calls().is_empty());
    assert_eq!(hub.fetches(), 0);
}

/// Test 7: partial failure is reported, not fatal
#[tokio::test]
async fn test_partial_failure_reported() {
    let config = EngineConfig::default();
    let hub = MockHub::new(three_lights()).with_failing_entity("light.kitchen");
    let model = FallbackAdapter::disabled();
    let audit = RecordingAudit::new();
    let orchestrator = Orchestrator::new(&config, &hub, &model, &audit);

    let outcome = orchestrator.handle_turn(1, "turn off all lights").await;

    assert_eq!(hub.calls().len(), 3);
    match &outcome {
        TurnOutcome::Executed(result) => {
            assert_eq!(result.attempted, 3);
            assert_eq!(result.succeeded, 2);
        }
        other => panic!("expected Executed, got {:?}", other),
    }
    assert!(outcome.render().contains("2/3"));
    assert!(outcome.is_success());
}

/// Test 8: status questions read state and never write
#[tokio::test]
async fn test_status_question_makes_no_calls() {
    let config = EngineConfig::default();
    let hub = MockHub::new(vec![
        DeviceState::new("lock.front_door", "locked", "Front Door"),
        DeviceState::new("light.kitchen", "on", "Kitchen Light"),
    ]);
    let model = FallbackAdapter::disabled();
    let audit = RecordingAudit::new();
    let orchestrator = Orchestrator::new(&config, &hub, &model, &audit);

    let outcome = orchestrator.handle_turn(1, "is the front door locked?").await;

    assert!(hub.calls().is_empty());
    match outcome {
        TurnOutcome::Status { report } => {
            assert!(report.contains("Front Door"));
            assert!(report.contains("locked"));
        }
        other => panic!("expected Status, got {:?}", other),
    }
}

/// Test 9: actions route by the DEVICE's domain, not the parsed one
#[tokio::test]
async fn test_cover_and_lock_service_mapping() {
    let config = EngineConfig::default();
    let hub = MockHub::new(vec![
        DeviceState::new("cover.garage_door", "closed", "Garage Door"),
        DeviceState::new("lock.front_door", "unlocked", "Front Door Lock"),
    ]);
    let model = FallbackAdapter::disabled();
    let audit = RecordingAudit::new();
    let orchestrator = Orchestrator::new(&config, &hub, &model, &audit);

    orchestrator.handle_turn(1, "open the garage").await;
    orchestrator.handle_turn(1, "lock the front door").await;

    let calls = hub.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].domain, "cover");
    assert_eq!(calls[0].service, "open_cover");
    assert_eq!(calls[1].domain, "lock");
    assert_eq!(calls[1].service, "lock");
}

/// Test 10: the "gm" shortcut runs the morning scene through the same
/// execution path, and strictly within each step's domain
#[tokio::test]
async fn test_scene_shortcut() {
    let config = EngineConfig::default();
    let hub = MockHub::new(vec![
        DeviceState::new("light.kitchen", "off", "Kitchen Light"),
        DeviceState::new("light.bedroom_lamp", "off", "Bedroom Lamp"),
        DeviceState::new("switch.coffee_maker", "off", "Coffee Maker"),
        DeviceState::new("climate.hall", "heat", "Hall Thermostat"),
    ]);
    let model = FallbackAdapter::disabled();
    let audit = RecordingAudit::new();
    let orchestrator = Orchestrator::new(&config, &hub, &model, &audit);

    let outcome = orchestrator.handle_turn(1, "gm").await;

    let calls = hub.calls();
    assert!(calls
        .iter()
        .any(|c| c.entity_id == "switch.coffee_maker" && c.service == "turn_on"));
    assert!(calls
        .iter()
        .any(|c| c.entity_id == "climate.hall" && c.service == "set_temperature"));
    // No covers exist: the scene must not spill outside its domains
    assert!(calls.iter().all(|c| c.service != "open_cover"));
    match outcome {
        TurnOutcome::Scene { name, executed, failed } => {
            assert_eq!(name, "morning");
            assert_eq!(executed, 4);
            assert_eq!(failed, 0);
        }
        other => panic!("expected Scene, got {:?}", other),
    }
}

/// Test 11: greetings answer with the dashboard plus model commentary
#[tokio::test]
async fn test_greeting_dashboard() {
    let config = EngineConfig::default();
    let hub = MockHub::new(three_lights());
    let model = MockModel::empty();
    let audit = RecordingAudit::new();
    let orchestrator = Orchestrator::new(&config, &hub, &model, &audit);

    let outcome = orchestrator.handle_turn(1, "hello").await;

    assert!(hub.calls().is_empty());
    match outcome {
        TurnOutcome::Greeting { message } => {
            assert!(message.contains("Lights:   2/3 on"));
            assert!(message.contains("All quiet at home."));
        }
        other => panic!("expected Greeting, got {:?}", other),
    }
}

/// Test 12: out-of-range temperatures are rejected before any call
#[tokio::test]
async fn test_temperature_guard() {
    let config = EngineConfig::default();
    let hub = MockHub::new(vec![DeviceState::new("climate.hall", "heat", "Hall")]);
    let model = FallbackAdapter::disabled();
    let audit = RecordingAudit::new();
    let orchestrator = Orchestrator::new(&config, &hub, &model, &audit);

    let outcome = orchestrator.handle_turn(1, "set temperature to 80").await;

    assert!(hub.calls().is_empty());
    assert!(matches!(outcome, TurnOutcome::Rejected { .. }));
}

/// Test 13: over-budget users are cut off before any hub traffic
#[tokio::test]
async fn test_rate_limited_turn() {
    let config = EngineConfig {
        rate_limit_max_requests: 2,
        ..EngineConfig::default()
    };
    let hub = MockHub::new(three_lights());
    let model = FallbackAdapter::disabled();
    let audit = RecordingAudit::new();
    let orchestrator = Orchestrator::new(&config, &hub, &model, &audit);

    orchestrator.handle_turn(7, "turn on the kitchen light").await;
    orchestrator.handle_turn(7, "turn off the kitchen light").await;
    let fetches_before = hub.fetches();
    let outcome = orchestrator.handle_turn(7, "turn on the kitchen light").await;

    assert_eq!(outcome, TurnOutcome::RateLimited);
    assert_eq!(hub.fetches(), fetches_before);
}

/// Test 14: an unreachable hub is a clean outcome, not a crash, and the
/// next turn works again
#[tokio::test]
async fn test_hub_unavailable_does_not_poison_turns() {
    let config = EngineConfig::default();
    let hub = MockHub::unreachable();
    let model = FallbackAdapter::disabled();
    let audit = RecordingAudit::new();
    let orchestrator = Orchestrator::new(&config, &hub, &model, &audit);

    let outcome = orchestrator.handle_turn(1, "turn off all lights").await;
    assert_eq!(outcome, TurnOutcome::HubUnavailable);

    // Same orchestrator, healthy hub: the engine carries no poisoned state
    let healthy = MockHub::new(three_lights());
    let orchestrator = Orchestrator::new(&config, &healthy, &model, &audit);
    let outcome = orchestrator.handle_turn(1, "turn off all lights").await;
    assert!(matches!(outcome, TurnOutcome::Executed(_)));
}

/// Test 15: respond() sends exactly one message and writes the audit entry
#[tokio::test]
async fn test_respond_sends_and_audits() {
    let config = EngineConfig::default();
    let hub = MockHub::new(three_lights());
    let model = FallbackAdapter::disabled();
    let audit = RecordingAudit::new();
    let orchestrator = Orchestrator::new(&config, &hub, &model, &audit);
    let reply = BufferReply::new();

    orchestrator
        .respond(42, "turn off all lights", &reply)
        .await
        .unwrap();

    let messages = reply.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("3/3"));

    let entries = audit.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    let (user, text, category, success) = &entries[0];
    assert_eq!(*user, 42);
    assert_eq!(text, "turn off all lights");
    assert_eq!(category, "natural_language");
    assert!(*success);
}
