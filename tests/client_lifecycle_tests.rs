//! Client and engine lifecycle integration tests
//!
//! Initialization idempotence, retry after a failed engine start, destroy
//! safety, configuration refresh, call control verbs, and log routing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;
use tokio_test::assert_ok;

use softphone_core::engine::mock::{MockCall, MockEngine};
use softphone_core::engine::{EngineEvent, EngineTuning};
use softphone_core::{
    Auth, Call, CallDelegate, CallState, ClientError, Config, LoggingDelegate, SoftphoneClient,
};

struct NullDelegate;

#[async_trait::async_trait]
impl CallDelegate for NullDelegate {
    async fn incoming_call_received(&self, _call: Call) {}
    async fn outgoing_call_created(&self, _call: Call) {}
    async fn call_connected(&self, _call: Call) {}
    async fn call_updated(&self, _call: Call, _message: String) {}
    async fn call_ended(&self, _call: Call) {}
    async fn call_released(&self, _call: Call) {}
    async fn attended_transfer_merged(&self, _call: Call) {}
}

#[derive(Default)]
struct CapturingLogger {
    engine_lines: Mutex<Vec<String>>,
    client_lines: Mutex<Vec<String>>,
}

impl LoggingDelegate for CapturingLogger {
    fn on_engine_log(&self, message: &str) {
        self.engine_lines.lock().unwrap().push(message.to_string());
    }
    fn on_client_log(&self, message: &str) {
        self.client_lines.lock().unwrap().push(message.to_string());
    }
}

fn test_config() -> Config {
    let auth = Auth::new("alice", "secret", "sip.example.com", 5060);
    Config::new(auth, Arc::new(NullDelegate))
}

#[tokio::test]
async fn initialize_is_idempotent() {
    let engine = MockEngine::new();
    let client = SoftphoneClient::new(engine.clone());

    assert_ok!(client.initialize(test_config()).await);
    assert_ok!(client.initialize(test_config()).await);

    assert!(client.is_initialized());
    assert_eq!(engine.start_count(), 1);
}

#[tokio::test]
async fn failed_engine_start_is_retryable() {
    let engine = MockEngine::new();
    let client = SoftphoneClient::new(engine.clone());

    engine.set_start_should_fail(true);
    let result = client.initialize(test_config()).await;
    assert!(matches!(result, Err(ClientError::EngineStartFailed { .. })));
    assert!(!client.is_initialized());

    engine.set_start_should_fail(false);
    assert_ok!(client.initialize(test_config()).await);
    assert!(client.is_initialized());
}

#[tokio::test]
async fn initialize_applies_engine_options() {
    let engine = MockEngine::new();
    let client = SoftphoneClient::new(engine.clone());

    let config = test_config()
        .with_user_agent("test-phone/1.0")
        .with_stun("stun.example.com")
        .with_ring_sound("ring.wav");
    assert_ok!(client.initialize(config).await);

    assert_eq!(
        engine.recorded_user_agent(),
        Some("test-phone/1.0".to_string())
    );
    assert_eq!(
        engine.recorded_stun_server(),
        Some("stun.example.com".to_string())
    );
    assert_eq!(engine.recorded_tuning(), Some(EngineTuning::default()));
    // Engine-side log collection is rerouted through the event channel.
    assert!(!engine.log_collection_is_enabled());
    assert!(engine.is_started());
}

#[tokio::test]
async fn destroy_is_safe_at_any_point() {
    let engine = MockEngine::new();
    let client = SoftphoneClient::new(engine.clone());

    // Before initialize.
    client.destroy().await;
    assert!(!client.is_initialized());

    assert_ok!(client.initialize(test_config()).await);
    client.destroy().await;
    assert!(!client.is_initialized());
    assert!(!engine.is_started());

    // Twice in a row.
    client.destroy().await;
}

#[tokio::test]
async fn refresh_config_restarts_the_engine_core() {
    let engine = MockEngine::new();
    let client = SoftphoneClient::new(engine.clone());

    assert_ok!(client.initialize(test_config()).await);
    assert_ok!(client.refresh_config().await);

    assert!(client.is_initialized());
    assert_eq!(engine.start_count(), 2);
}

#[tokio::test]
async fn refresh_config_without_configuration_is_rejected() {
    let client = SoftphoneClient::new(MockEngine::new());
    let result = client.refresh_config().await;
    assert!(matches!(result, Err(ClientError::NoConfiguration)));
}

#[tokio::test]
async fn calling_before_initialize_yields_no_call() {
    let client = SoftphoneClient::new(MockEngine::new());
    assert!(client.call("sip:100@sip.example.com").await.is_none());
}

#[tokio::test]
async fn call_verbs_reach_the_engine_handle() {
    let engine = MockEngine::new();
    let client = SoftphoneClient::new(engine.clone());
    assert_ok!(client.initialize(test_config()).await);

    let call = client.call("sip:100@sip.example.com").await.unwrap();
    let actions = client.actions(call.clone());

    assert!(actions.accept().await);
    assert!(actions.hold(true).await);
    assert!(actions.hold(false).await);
    assert!(actions.send_dtmf("5").await);
    assert!(actions.send_dtmf("123#").await);
    assert!(!actions.send_dtmf("").await);
    assert!(actions.end().await);

    let handle = engine.placed_calls().pop().unwrap();
    assert_eq!(
        handle.operations(),
        vec![
            "accept".to_string(),
            "pause".to_string(),
            "resume".to_string(),
            "dtmf:5".to_string(),
            "dtmfs:123#".to_string(),
            "terminate".to_string(),
        ]
    );
    assert_eq!(call.state(), CallState::Ended);
}

#[tokio::test]
async fn terminate_all_calls_reaches_the_engine() {
    let engine = MockEngine::new();
    let client = SoftphoneClient::new(engine.clone());
    assert_ok!(client.initialize(test_config()).await);

    let call = client.call("sip:100@sip.example.com").await.unwrap();
    client.terminate_all_calls().await;

    assert_eq!(engine.terminate_all_count(), 1);
    assert_eq!(call.state(), CallState::Ended);
}

#[tokio::test]
async fn microphone_mute_round_trips() {
    let client = SoftphoneClient::new(MockEngine::new());

    assert!(!client.is_microphone_muted());
    client.set_microphone_muted(true);
    assert!(client.is_microphone_muted());
    client.set_microphone_muted(false);
    assert!(!client.is_microphone_muted());
}

#[tokio::test]
async fn display_name_is_surfaced_on_the_call() {
    let handle = MockCall::inbound("sip:200@sip.example.com");
    handle.set_display_name("Front Desk");
    handle.set_duration(Duration::from_secs(42));

    let engine = MockEngine::new();
    let client = SoftphoneClient::new(engine.clone());

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let config = Config::new(
        Auth::new("alice", "secret", "sip.example.com", 5060),
        Arc::new(ForwardingDelegate { tx }),
    );
    assert_ok!(client.initialize(config).await);
    engine.push_call_state(&handle, CallState::IncomingReceived, "ringing");

    let call = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for incoming call")
        .expect("delegate channel closed");
    assert_eq!(call.display_name(), Some("Front Desk".to_string()));
    assert_eq!(call.duration(), Duration::from_secs(42));
}

/// Delegate that forwards incoming calls to a channel
struct ForwardingDelegate {
    tx: tokio::sync::mpsc::UnboundedSender<Call>,
}

#[async_trait::async_trait]
impl CallDelegate for ForwardingDelegate {
    async fn incoming_call_received(&self, call: Call) {
        let _ = self.tx.send(call);
    }
    async fn outgoing_call_created(&self, _call: Call) {}
    async fn call_connected(&self, _call: Call) {}
    async fn call_updated(&self, _call: Call, _message: String) {}
    async fn call_ended(&self, _call: Call) {}
    async fn call_released(&self, _call: Call) {}
    async fn attended_transfer_merged(&self, _call: Call) {}
}

#[tokio::test]
async fn log_lines_route_to_the_logging_delegate() {
    let engine = MockEngine::new();
    let client = SoftphoneClient::new(engine.clone());

    let logger = Arc::new(CapturingLogger::default());
    let config = test_config().with_logging_delegate(logger.clone());
    assert_ok!(client.initialize(config).await);

    engine.push_event(EngineEvent::Log {
        message: "REGISTER sip:sip.example.com SIP/2.0".to_string(),
    });

    let call = client.call("sip:100@sip.example.com").await.unwrap();
    client.actions(call).hold(true).await;
    sleep(Duration::from_millis(100)).await;

    assert_eq!(
        &*logger.engine_lines.lock().unwrap(),
        &["REGISTER sip:sip.example.com SIP/2.0".to_string()]
    );
    assert!(logger
        .client_lines
        .lock()
        .unwrap()
        .iter()
        .any(|line| line == "Pausing call."));
}
