//! Call lifecycle event routing integration tests
//!
//! Pushes scripted engine events and asserts which delegate callbacks
//! fire, in what order, and with which call data.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::{sleep, timeout};
use tokio_test::assert_ok;

use softphone_core::engine::mock::{MockCall, MockEngine};
use softphone_core::{Auth, Call, CallDelegate, CallState, Config, SoftphoneClient};

/// Delegate that records every callback as a tag line
struct CapturingDelegate {
    tx: mpsc::UnboundedSender<String>,
}

#[async_trait::async_trait]
impl CallDelegate for CapturingDelegate {
    async fn incoming_call_received(&self, call: Call) {
        let _ = self.tx.send(format!("incoming:{}", call.remote_number()));
    }
    async fn outgoing_call_created(&self, call: Call) {
        let _ = self.tx.send(format!("outgoing:{}", call.remote_number()));
    }
    async fn call_connected(&self, call: Call) {
        let _ = self.tx.send(format!("connected:{}", call.remote_number()));
    }
    async fn call_updated(&self, _call: Call, message: String) {
        let _ = self.tx.send(format!("updated:{message}"));
    }
    async fn call_ended(&self, call: Call) {
        let _ = self.tx.send(format!("ended:{}", call.remote_number()));
    }
    async fn call_released(&self, call: Call) {
        let _ = self.tx.send(format!("released:{}", call.remote_number()));
    }
    async fn attended_transfer_merged(&self, call: Call) {
        let _ = self.tx.send(format!("merged:{}", call.remote_number()));
    }
}

async fn setup() -> (SoftphoneClient, Arc<MockEngine>, UnboundedReceiver<String>) {
    let engine = MockEngine::new();
    let client = SoftphoneClient::new(engine.clone());
    let (tx, rx) = mpsc::unbounded_channel();
    let auth = Auth::new("alice", "secret", "sip.example.com", 5060);
    let config = Config::new(auth, Arc::new(CapturingDelegate { tx }));
    assert_ok!(client.initialize(config).await);
    (client, engine, rx)
}

async fn next_tag(rx: &mut UnboundedReceiver<String>) -> String {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for delegate callback")
        .expect("delegate channel closed")
}

#[tokio::test]
async fn outgoing_call_surfaces_as_outgoing_call_created() {
    let (client, engine, mut rx) = setup().await;

    let call = client.call("sip:100@sip.example.com").await.unwrap();
    assert_eq!(call.remote_number(), "100");

    let handle = engine.placed_calls().pop().unwrap();
    engine.push_call_state(&handle, CallState::OutgoingDidInitialize, "initialized");

    assert_eq!(next_tag(&mut rx).await, "outgoing:100");
}

#[tokio::test]
async fn incoming_call_preserves_identity_headers() {
    let (_client, engine, mut rx) = setup().await;

    let handle = MockCall::inbound("sip:200@sip.example.com");
    handle.set_invite_header("Remote-Party-ID", "<sip:ivr@sip.example.com>");
    handle.set_invite_header("P-Asserted-Identity", "<sip:200@sip.example.com>");
    engine.push_call_state(&handle, CallState::IncomingReceived, "ringing");

    assert_eq!(next_tag(&mut rx).await, "incoming:200");

    // Headers survive in the custom set even after the engine would have
    // dropped the initial INVITE.
    use softphone_core::engine::EngineCall;
    assert_eq!(
        handle.custom_header("Remote-Party-ID").as_deref(),
        Some("<sip:ivr@sip.example.com>")
    );
    assert_eq!(
        handle.custom_header("P-Asserted-Identity").as_deref(),
        Some("<sip:200@sip.example.com>")
    );
}

#[tokio::test]
async fn full_lifecycle_arrives_in_order() {
    let (_client, engine, mut rx) = setup().await;

    let handle = MockCall::inbound("sip:200@sip.example.com");
    engine.push_call_state(&handle, CallState::IncomingReceived, "ringing");
    engine.push_call_state(&handle, CallState::Connected, "answered");
    engine.push_call_state(&handle, CallState::Paused, "on hold");
    engine.push_call_state(&handle, CallState::Ended, "hangup");
    engine.push_call_state(&handle, CallState::Released, "released");

    assert_eq!(next_tag(&mut rx).await, "incoming:200");
    assert_eq!(next_tag(&mut rx).await, "connected:200");
    assert_eq!(next_tag(&mut rx).await, "updated:on hold");
    assert_eq!(next_tag(&mut rx).await, "ended:200");
    assert_eq!(next_tag(&mut rx).await, "released:200");
}

#[tokio::test]
async fn error_state_surfaces_as_call_ended() {
    let (_client, engine, mut rx) = setup().await;

    let handle = MockCall::outbound("sip:100@sip.example.com");
    engine.push_call_state(&handle, CallState::Error, "486 Busy Here");

    assert_eq!(next_tag(&mut rx).await, "ended:100");
}

#[tokio::test]
async fn released_is_dispatched_at_most_once() {
    let (_client, engine, mut rx) = setup().await;

    let handle = MockCall::inbound("sip:200@sip.example.com");
    engine.push_call_state(&handle, CallState::Ended, "hangup");
    engine.push_call_state(&handle, CallState::Released, "released");
    engine.push_call_state(&handle, CallState::Released, "released again");
    // A sentinel proves nothing arrived between the first release and it.
    let other = MockCall::inbound("sip:300@sip.example.com");
    engine.push_call_state(&other, CallState::IncomingReceived, "ringing");

    assert_eq!(next_tag(&mut rx).await, "ended:200");
    assert_eq!(next_tag(&mut rx).await, "released:200");
    assert_eq!(next_tag(&mut rx).await, "incoming:300");
}

#[tokio::test]
async fn call_without_remote_address_is_terminated_silently() {
    let (_client, engine, mut rx) = setup().await;

    let handle = MockCall::without_remote();
    engine.push_call_state(&handle, CallState::IncomingReceived, "ringing");
    sleep(Duration::from_millis(100)).await;

    assert!(handle.was_terminated());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn attended_transfer_merge_is_reported() {
    let (_client, engine, mut rx) = setup().await;

    let handle = MockCall::outbound("sip:300@sip.example.com");
    engine.push_transfer_merged(&handle, CallState::Connected);

    assert_eq!(next_tag(&mut rx).await, "merged:300");
}

#[tokio::test]
async fn released_call_leaves_the_active_set() {
    let (client, engine, mut rx) = setup().await;

    let call = client.call("sip:100@sip.example.com").await.unwrap();
    let handle = engine.placed_calls().pop().unwrap();
    engine.push_call_state(&handle, CallState::Connected, "answered");
    assert_eq!(next_tag(&mut rx).await, "connected:100");

    engine.push_call_state(&handle, CallState::Released, "released");
    assert_eq!(next_tag(&mut rx).await, "released:100");

    // A stale session over the released call can no longer transfer.
    let target = client.call("sip:300@sip.example.com").await.unwrap();
    let session = softphone_core::AttendedTransferSession {
        from: call,
        to: target,
    };
    assert!(!client.finish_attended_transfer(session).await);
}
