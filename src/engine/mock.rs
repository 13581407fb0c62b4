//! Scripted in-memory engine
//!
//! [`MockEngine`] implements the full engine boundary without any network
//! or media. Tests (and consumers writing their own integration tests)
//! construct it, attach payloads and calls, and push [`EngineEvent`]s to
//! drive the library exactly the way a real engine binding would.
//!
//! Every imperative operation is recorded so assertions can check what the
//! library asked the engine to do.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;

use crate::call::{CallDirection, CallState};
use crate::engine::{
    EngineAccount, EngineAudioStats, EngineCall, EngineCallLog, EngineCallStatus,
    EngineErrorInfo, EngineEvent, EngineEventSink, EnginePayloadType, EngineRegistrationState,
    EngineTuning, RemoteAddress, SipEngine, TransportConfig,
};
use crate::error::EngineError;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// In-memory engine core
pub struct MockEngine {
    sink: Mutex<Option<EngineEventSink>>,
    started: AtomicBool,
    start_count: AtomicUsize,
    start_should_fail: AtomicBool,
    invite_should_fail: AtomicBool,
    iterate_count: AtomicUsize,
    /// When set (the default), iterating moves every binding with
    /// registration disabled to `Cleared`, the way a live engine would
    /// once the un-REGISTER round trip completes.
    clear_disabled_on_iterate: AtomicBool,
    accounts: Mutex<Vec<Arc<MockAccount>>>,
    auth_infos: Mutex<Vec<(String, String)>>,
    audio_payloads: Mutex<Vec<Arc<MockPayloadType>>>,
    video_payloads: Mutex<Vec<Arc<MockPayloadType>>>,
    calls: Mutex<Vec<Arc<MockCall>>>,
    mic_enabled: AtomicBool,
    terminate_all_count: AtomicUsize,
    user_agent: Mutex<Option<String>>,
    stun_server: Mutex<Option<String>>,
    ring_sound: Mutex<Option<String>>,
    transport: Mutex<Option<TransportConfig>>,
    tuning: Mutex<Option<EngineTuning>>,
    log_collection_enabled: AtomicBool,
    srtp_mandatory: AtomicBool,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sink: Mutex::new(None),
            started: AtomicBool::new(false),
            start_count: AtomicUsize::new(0),
            start_should_fail: AtomicBool::new(false),
            invite_should_fail: AtomicBool::new(false),
            iterate_count: AtomicUsize::new(0),
            clear_disabled_on_iterate: AtomicBool::new(true),
            accounts: Mutex::new(Vec::new()),
            auth_infos: Mutex::new(Vec::new()),
            audio_payloads: Mutex::new(Vec::new()),
            video_payloads: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            mic_enabled: AtomicBool::new(true),
            terminate_all_count: AtomicUsize::new(0),
            user_agent: Mutex::new(None),
            stun_server: Mutex::new(None),
            ring_sound: Mutex::new(None),
            transport: Mutex::new(None),
            tuning: Mutex::new(None),
            log_collection_enabled: AtomicBool::new(true),
            srtp_mandatory: AtomicBool::new(false),
        })
    }

    /// Add an audio payload to the engine payload table
    pub fn add_audio_payload(&self, mime_type: &str) -> Arc<MockPayloadType> {
        let payload = Arc::new(MockPayloadType::new(mime_type, 8000, 1));
        self.audio_payloads.lock().unwrap().push(payload.clone());
        payload
    }

    /// Add a video payload to the engine payload table
    pub fn add_video_payload(&self, mime_type: &str) -> Arc<MockPayloadType> {
        let payload = Arc::new(MockPayloadType::new(mime_type, 90000, 1));
        self.video_payloads.lock().unwrap().push(payload.clone());
        payload
    }

    /// Push a raw event into the installed sink
    ///
    /// Panics if no sink was installed; initialize the adapter first.
    pub fn push_event(&self, event: EngineEvent) {
        let sink = self.sink.lock().unwrap();
        sink.as_ref()
            .expect("no event sink installed")
            .send(event)
            .expect("event channel closed");
    }

    /// Report a call-state transition
    pub fn push_call_state(&self, call: &Arc<MockCall>, state: CallState, message: &str) {
        call.set_state(state);
        self.push_event(EngineEvent::CallStateChanged {
            call: call.clone() as Arc<dyn EngineCall>,
            state,
            message: message.to_string(),
        });
    }

    /// Report a registration-state transition
    pub fn push_registration_state(&self, state: EngineRegistrationState, message: &str) {
        if let Some(account) = self.accounts.lock().unwrap().first() {
            account.set_registration_state(state);
        }
        self.push_event(EngineEvent::RegistrationStateChanged {
            state,
            message: message.to_string(),
        });
    }

    /// Report an attended-transfer merge for `call`
    pub fn push_transfer_merged(&self, call: &Arc<MockCall>, state: CallState) {
        self.push_event(EngineEvent::TransferStateChanged {
            call: call.clone() as Arc<dyn EngineCall>,
            state,
        });
    }

    pub fn set_start_should_fail(&self, fail: bool) {
        self.start_should_fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_invite_should_fail(&self, fail: bool) {
        self.invite_should_fail.store(fail, Ordering::SeqCst);
    }

    /// Keep disabled bindings stuck in their current state while draining
    pub fn set_clear_disabled_on_iterate(&self, clear: bool) {
        self.clear_disabled_on_iterate.store(clear, Ordering::SeqCst);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn start_count(&self) -> usize {
        self.start_count.load(Ordering::SeqCst)
    }

    pub fn iterate_count(&self) -> usize {
        self.iterate_count.load(Ordering::SeqCst)
    }

    pub fn terminate_all_count(&self) -> usize {
        self.terminate_all_count.load(Ordering::SeqCst)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }

    pub fn mock_accounts(&self) -> Vec<Arc<MockAccount>> {
        self.accounts.lock().unwrap().clone()
    }

    pub fn recorded_user_agent(&self) -> Option<String> {
        self.user_agent.lock().unwrap().clone()
    }

    pub fn recorded_stun_server(&self) -> Option<String> {
        self.stun_server.lock().unwrap().clone()
    }

    pub fn recorded_transport(&self) -> Option<TransportConfig> {
        *self.transport.lock().unwrap()
    }

    pub fn recorded_tuning(&self) -> Option<EngineTuning> {
        *self.tuning.lock().unwrap()
    }

    pub fn recorded_auth_infos(&self) -> Vec<(String, String)> {
        self.auth_infos.lock().unwrap().clone()
    }

    pub fn log_collection_is_enabled(&self) -> bool {
        self.log_collection_enabled.load(Ordering::SeqCst)
    }

    pub fn srtp_is_mandatory(&self) -> bool {
        self.srtp_mandatory.load(Ordering::SeqCst)
    }

    /// Calls placed through [`SipEngine::invite`], oldest first
    pub fn placed_calls(&self) -> Vec<Arc<MockCall>> {
        self.calls.lock().unwrap().clone()
    }
}

impl SipEngine for MockEngine {
    fn install_event_sink(&self, sink: EngineEventSink) {
        *self.sink.lock().unwrap() = Some(sink);
    }

    fn set_log_collection_enabled(&self, enabled: bool) {
        self.log_collection_enabled.store(enabled, Ordering::SeqCst);
    }

    fn set_user_agent(&self, user_agent: &str) {
        *self.user_agent.lock().unwrap() = Some(user_agent.to_string());
    }

    fn set_ring_sound(&self, path: Option<&str>) {
        *self.ring_sound.lock().unwrap() = path.map(str::to_string);
    }

    fn set_stun_server(&self, server: Option<&str>) {
        *self.stun_server.lock().unwrap() = server.map(str::to_string);
    }

    fn apply_transport(&self, transport: TransportConfig) -> Result<(), EngineError> {
        *self.transport.lock().unwrap() = Some(transport);
        Ok(())
    }

    fn set_media_encryption_mandatory(&self, mandatory: bool) -> Result<(), EngineError> {
        self.srtp_mandatory.store(mandatory, Ordering::SeqCst);
        Ok(())
    }

    fn apply_tuning(&self, tuning: EngineTuning) {
        *self.tuning.lock().unwrap() = Some(tuning);
    }

    fn start(&self) -> Result<(), EngineError> {
        if self.start_should_fail.load(Ordering::SeqCst) {
            return Err(EngineError::Core("scripted start failure".to_string()));
        }
        self.started.store(true, Ordering::SeqCst);
        self.start_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
    }

    fn iterate(&self) {
        self.iterate_count.fetch_add(1, Ordering::SeqCst);
        if self.clear_disabled_on_iterate.load(Ordering::SeqCst) {
            for account in self.accounts.lock().unwrap().iter() {
                if !account.register_enabled.load(Ordering::SeqCst) {
                    account.set_registration_state(EngineRegistrationState::Cleared);
                }
            }
        }
    }

    fn invite(&self, uri: &str) -> Result<Arc<dyn EngineCall>, EngineError> {
        if self.invite_should_fail.load(Ordering::SeqCst) || uri.is_empty() {
            return Err(EngineError::Operation(format!(
                "invite rejected for '{uri}'"
            )));
        }
        let call = MockCall::outbound(uri);
        self.calls.lock().unwrap().push(call.clone());
        Ok(call)
    }

    fn terminate_all_calls(&self) -> Result<(), EngineError> {
        self.terminate_all_count.fetch_add(1, Ordering::SeqCst);
        for call in self.calls.lock().unwrap().iter() {
            let _ = call.terminate();
        }
        Ok(())
    }

    fn create_account(
        &self,
        identity: &str,
        server_address: &str,
    ) -> Result<Arc<dyn EngineAccount>, EngineError> {
        let account = Arc::new(MockAccount::new(identity, server_address));
        self.accounts.lock().unwrap().push(account.clone());
        Ok(account)
    }

    fn add_auth_info(&self, username: &str, password: &str) {
        self.auth_infos
            .lock()
            .unwrap()
            .push((username.to_string(), password.to_string()));
    }

    fn clear_auth_info(&self) {
        self.auth_infos.lock().unwrap().clear();
    }

    fn accounts(&self) -> Vec<Arc<dyn EngineAccount>> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .map(|a| a.clone() as Arc<dyn EngineAccount>)
            .collect()
    }

    fn remove_account(&self, account: &Arc<dyn EngineAccount>) {
        let identity = account.identity();
        self.accounts
            .lock()
            .unwrap()
            .retain(|a| a.identity() != identity);
    }

    fn audio_payload_types(&self) -> Vec<Arc<dyn EnginePayloadType>> {
        self.audio_payloads
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.clone() as Arc<dyn EnginePayloadType>)
            .collect()
    }

    fn video_payload_types(&self) -> Vec<Arc<dyn EnginePayloadType>> {
        self.video_payloads
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.clone() as Arc<dyn EnginePayloadType>)
            .collect()
    }

    fn set_mic_enabled(&self, enabled: bool) {
        self.mic_enabled.store(enabled, Ordering::SeqCst);
    }

    fn mic_enabled(&self) -> bool {
        self.mic_enabled.load(Ordering::SeqCst)
    }
}

/// In-memory registration binding
pub struct MockAccount {
    identity: String,
    server_address: String,
    state: Mutex<EngineRegistrationState>,
    register_enabled: AtomicBool,
    editing: AtomicBool,
    refresh_count: AtomicUsize,
}

impl MockAccount {
    fn new(identity: &str, server_address: &str) -> Self {
        Self {
            identity: identity.to_string(),
            server_address: server_address.to_string(),
            state: Mutex::new(EngineRegistrationState::Progress),
            register_enabled: AtomicBool::new(true),
            editing: AtomicBool::new(false),
            refresh_count: AtomicUsize::new(0),
        }
    }

    pub fn set_registration_state(&self, state: EngineRegistrationState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_count.load(Ordering::SeqCst)
    }

    pub fn register_is_enabled(&self) -> bool {
        self.register_enabled.load(Ordering::SeqCst)
    }

    pub fn server_address(&self) -> &str {
        &self.server_address
    }
}

impl EngineAccount for MockAccount {
    fn identity(&self) -> String {
        self.identity.clone()
    }

    fn registration_state(&self) -> EngineRegistrationState {
        *self.state.lock().unwrap()
    }

    fn edit(&self) {
        self.editing.store(true, Ordering::SeqCst);
    }

    fn set_register_enabled(&self, enabled: bool) {
        self.register_enabled.store(enabled, Ordering::SeqCst);
    }

    fn done(&self) -> Result<(), EngineError> {
        self.editing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn refresh_register(&self) {
        self.refresh_count.fetch_add(1, Ordering::SeqCst);
        *self.state.lock().unwrap() = EngineRegistrationState::Progress;
    }
}

/// In-memory payload table entry
pub struct MockPayloadType {
    mime_type: String,
    clock_rate: u32,
    channels: u8,
    enabled: AtomicBool,
}

impl MockPayloadType {
    fn new(mime_type: &str, clock_rate: u32, channels: u8) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            clock_rate,
            channels,
            enabled: AtomicBool::new(true),
        }
    }
}

impl EnginePayloadType for MockPayloadType {
    fn mime_type(&self) -> String {
        self.mime_type.clone()
    }

    fn clock_rate(&self) -> u32 {
        self.clock_rate
    }

    fn channels(&self) -> u8 {
        self.channels
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

/// In-memory call handle
///
/// Operations are recorded in order; `operations()` returns entries like
/// `"accept"`, `"terminate"`, `"transfer:sip:300@example.com"`.
pub struct MockCall {
    handle_id: u64,
    direction: CallDirection,
    remote: Mutex<Option<RemoteAddress>>,
    to: Mutex<Option<RemoteAddress>>,
    state: Mutex<CallState>,
    invite_headers: Mutex<HashMap<String, String>>,
    custom_headers: Mutex<HashMap<String, String>>,
    call_log: Mutex<Option<EngineCallLog>>,
    error: Mutex<Option<EngineErrorInfo>>,
    stats: Mutex<Option<EngineAudioStats>>,
    duration: Mutex<Duration>,
    operations: Mutex<Vec<String>>,
    ops_should_fail: AtomicBool,
}

impl MockCall {
    fn new(remote: Option<RemoteAddress>, direction: CallDirection) -> Arc<Self> {
        Arc::new(Self {
            handle_id: NEXT_HANDLE_ID.fetch_add(1, Ordering::SeqCst),
            direction,
            to: Mutex::new(remote.clone()),
            remote: Mutex::new(remote),
            state: Mutex::new(CallState::Idle),
            invite_headers: Mutex::new(HashMap::new()),
            custom_headers: Mutex::new(HashMap::new()),
            call_log: Mutex::new(None),
            error: Mutex::new(None),
            stats: Mutex::new(None),
            duration: Mutex::new(Duration::ZERO),
            operations: Mutex::new(Vec::new()),
            ops_should_fail: AtomicBool::new(false),
        })
    }

    fn parse_address(uri: &str) -> RemoteAddress {
        let stripped = uri.strip_prefix("sip:").unwrap_or(uri);
        let (username, domain) = match stripped.split_once('@') {
            Some((user, domain)) => (user.to_string(), domain.to_string()),
            None => (stripped.to_string(), String::new()),
        };
        RemoteAddress {
            username,
            display_name: None,
            domain,
            transport: None,
        }
    }

    /// A call the local party placed
    pub fn outbound(uri: &str) -> Arc<Self> {
        Self::new(Some(Self::parse_address(uri)), CallDirection::Outbound)
    }

    /// A call the remote party placed
    pub fn inbound(uri: &str) -> Arc<Self> {
        Self::new(Some(Self::parse_address(uri)), CallDirection::Inbound)
    }

    /// A half-formed call without a resolvable remote address
    pub fn without_remote() -> Arc<Self> {
        Self::new(None, CallDirection::Inbound)
    }

    pub fn set_state(&self, state: CallState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn set_display_name(&self, display_name: &str) {
        if let Some(remote) = self.remote.lock().unwrap().as_mut() {
            remote.display_name = Some(display_name.to_string());
        }
    }

    /// Place a header on the initial INVITE
    pub fn set_invite_header(&self, name: &str, value: &str) {
        self.invite_headers
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }

    /// Record a call-log entry with the given direction and status
    pub fn record_log(&self, direction: CallDirection, status: EngineCallStatus) {
        *self.call_log.lock().unwrap() = Some(EngineCallLog {
            call_id: format!("mock-{}", self.handle_id),
            direction,
            status,
            quality: 4.0,
            start_date: Utc::now(),
            ref_key: None,
        });
    }

    pub fn set_error_info(&self, info: EngineErrorInfo) {
        *self.error.lock().unwrap() = Some(info);
    }

    pub fn set_audio_stats(&self, stats: EngineAudioStats) {
        *self.stats.lock().unwrap() = Some(stats);
    }

    pub fn set_duration(&self, duration: Duration) {
        *self.duration.lock().unwrap() = duration;
    }

    pub fn set_ops_should_fail(&self, fail: bool) {
        self.ops_should_fail.store(fail, Ordering::SeqCst);
    }

    /// Every operation the library issued against this handle, in order
    pub fn operations(&self) -> Vec<String> {
        self.operations.lock().unwrap().clone()
    }

    pub fn was_terminated(&self) -> bool {
        self.operations().iter().any(|op| op == "terminate")
    }

    fn perform(&self, op: String, next_state: Option<CallState>) -> Result<(), EngineError> {
        if self.ops_should_fail.load(Ordering::SeqCst) {
            return Err(EngineError::Operation(format!("scripted failure: {op}")));
        }
        self.operations.lock().unwrap().push(op);
        if let Some(state) = next_state {
            self.set_state(state);
        }
        Ok(())
    }
}

impl EngineCall for MockCall {
    fn handle_id(&self) -> u64 {
        self.handle_id
    }

    fn remote_address(&self) -> Option<RemoteAddress> {
        self.remote.lock().unwrap().clone()
    }

    fn to_address(&self) -> Option<RemoteAddress> {
        self.to.lock().unwrap().clone()
    }

    fn state(&self) -> CallState {
        *self.state.lock().unwrap()
    }

    fn direction(&self) -> CallDirection {
        self.direction
    }

    fn duration(&self) -> Duration {
        *self.duration.lock().unwrap()
    }

    fn current_quality(&self) -> f32 {
        4.2
    }

    fn average_quality(&self) -> f32 {
        4.0
    }

    fn media_encryption(&self) -> Option<String> {
        Some("srtp".to_string())
    }

    fn accept(&self) -> Result<(), EngineError> {
        self.perform("accept".to_string(), Some(CallState::Connected))
    }

    fn terminate(&self) -> Result<(), EngineError> {
        self.perform("terminate".to_string(), Some(CallState::Ended))
    }

    fn pause(&self) -> Result<(), EngineError> {
        self.perform("pause".to_string(), Some(CallState::Paused))
    }

    fn resume(&self) -> Result<(), EngineError> {
        self.perform("resume".to_string(), Some(CallState::StreamsRunning))
    }

    fn transfer(&self, target: &str) -> Result<(), EngineError> {
        self.perform(format!("transfer:{target}"), None)
    }

    fn transfer_to_another(&self, other: &dyn EngineCall) -> Result<(), EngineError> {
        self.perform(format!("transfer_to_another:{}", other.handle_id()), None)
    }

    fn send_dtmf(&self, digit: char) -> Result<(), EngineError> {
        self.perform(format!("dtmf:{digit}"), None)
    }

    fn send_dtmfs(&self, digits: &str) -> Result<(), EngineError> {
        self.perform(format!("dtmfs:{digits}"), None)
    }

    fn invite_header(&self, name: &str) -> Option<String> {
        self.invite_headers.lock().unwrap().get(name).cloned()
    }

    fn add_custom_header(&self, name: &str, value: &str) {
        self.custom_headers
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }

    fn custom_header(&self, name: &str) -> Option<String> {
        self.custom_headers.lock().unwrap().get(name).cloned()
    }

    fn call_log(&self) -> Option<EngineCallLog> {
        self.call_log.lock().unwrap().clone()
    }

    fn error_info(&self) -> Option<EngineErrorInfo> {
        self.error.lock().unwrap().clone()
    }

    fn audio_stats(&self) -> Option<EngineAudioStats> {
        self.stats.lock().unwrap().clone()
    }
}
