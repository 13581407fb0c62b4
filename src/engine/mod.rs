//! Boundary with the external SIP/RTP engine
//!
//! This library does not implement SIP signaling, RTP transport, or codec
//! DSP itself; all of that is delegated to an engine collaborator behind
//! the traits in this module. A concrete engine binding implements
//! [`SipEngine`] (one core), [`EngineCall`] (one dialog), [`EngineAccount`]
//! (one registration binding), and [`EnginePayloadType`] (one negotiable
//! codec), and delivers its callbacks as [`EngineEvent`] values over the
//! sink installed by the adapter.
//!
//! Instead of the many ad hoc listener objects a native engine SDK wants,
//! everything the engine reports flows through a single ordered channel.
//! One dispatcher task consumes it, which is what gives the library its
//! ordering and thread-safety guarantees.
//!
//! A scripted in-memory engine for tests lives in [`mock`].

pub mod mock;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::call::{CallDirection, CallState};

/// Sender half of the engine event channel
///
/// Installed on the engine by the adapter at initialization; the engine
/// pushes every callback it would otherwise deliver to a listener object
/// through this sender.
pub type EngineEventSink = mpsc::UnboundedSender<EngineEvent>;

/// One engine callback, reified as a value
///
/// The order events are pushed into the sink is the order the library
/// observes them; engines must push from a single thread or otherwise
/// guarantee a meaningful order per call.
#[derive(Clone)]
pub enum EngineEvent {
    /// A call moved to a new state
    CallStateChanged {
        /// The engine call handle the transition belongs to
        call: Arc<dyn EngineCall>,
        /// The state the call moved to
        state: CallState,
        /// Free-text message from the engine (often the SIP reason phrase)
        message: String,
    },
    /// The registration binding moved to a new state
    RegistrationStateChanged {
        /// The state the registration moved to
        state: EngineRegistrationState,
        /// Free-text message from the engine
        message: String,
    },
    /// The engine merged an attended transfer; `call` is the surviving call
    TransferStateChanged {
        call: Arc<dyn EngineCall>,
        state: CallState,
    },
    /// A diagnostic line from the engine's own logging service
    Log { message: String },
}

impl std::fmt::Debug for EngineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineEvent::CallStateChanged { state, message, .. } => f
                .debug_struct("CallStateChanged")
                .field("state", state)
                .field("message", message)
                .finish(),
            EngineEvent::RegistrationStateChanged { state, message } => f
                .debug_struct("RegistrationStateChanged")
                .field("state", state)
                .field("message", message)
                .finish(),
            EngineEvent::TransferStateChanged { state, .. } => f
                .debug_struct("TransferStateChanged")
                .field("state", state)
                .finish(),
            EngineEvent::Log { message } => {
                f.debug_struct("Log").field("message", message).finish()
            }
        }
    }
}

/// Registration states as the engine reports them
///
/// Mapped onto the public [`crate::RegistrationState`] by the registration
/// coordinator; `Ok` and `Failed` are the terminal states that consume the
/// single-shot registration callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineRegistrationState {
    None,
    Progress,
    Ok,
    Failed,
    Cleared,
}

/// Transport parameters applied before registering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Port used for every transport the engine listens on
    pub port: u16,
    /// Whether signaling must use TLS
    pub encryption: bool,
}

/// Post-start engine tuning
///
/// Applied once after the engine core has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTuning {
    pub adaptive_rate_control: bool,
    pub echo_cancellation: bool,
    /// Send DTMF as RFC 2833 telephone-events rather than SIP INFO
    pub rfc2833_dtmf: bool,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            adaptive_rate_control: true,
            echo_cancellation: true,
            rfc2833_dtmf: true,
        }
    }
}

/// Remote (or local) address of one side of a dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAddress {
    /// User part of the address
    pub username: String,
    /// Display name, when the far side supplied one
    pub display_name: Option<String>,
    /// Domain part of the address
    pub domain: String,
    /// Transport the address resolved to, when known
    pub transport: Option<String>,
}

/// Terminal status of a call as recorded in the engine call log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCallStatus {
    Success,
    Aborted,
    Missed,
    Declined,
    EarlyAborted,
    AcceptedElsewhere,
    DeclinedElsewhere,
}

/// Engine call-log entry for one call
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCallLog {
    pub call_id: String,
    pub direction: CallDirection,
    pub status: EngineCallStatus,
    pub quality: f32,
    pub start_date: DateTime<Utc>,
    pub ref_key: Option<String>,
}

/// Detail of the engine-level error that ended a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineErrorInfo {
    pub reason: String,
    pub phrase: String,
    pub protocol: String,
    pub protocol_code: i32,
}

/// Audio stream statistics for the call-info report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineAudioStats {
    pub codec_mime_type: Option<String>,
    pub codec_channels: Option<u8>,
    pub download_bandwidth: f32,
    pub upload_bandwidth: f32,
    pub jitter_buffer_size_ms: f32,
    pub local_loss_rate: f32,
    pub local_late_rate: f32,
    pub receiver_loss_rate: f32,
    pub sender_loss_rate: f32,
    pub receiver_interarrival_jitter: f32,
    pub sender_interarrival_jitter: f32,
    pub round_trip_delay: f32,
    pub rtcp_download_bandwidth: f32,
    pub rtcp_upload_bandwidth: f32,
}

use crate::error::EngineError;

/// One engine core
///
/// Exactly one core exists per adapter. All methods are synchronous from
/// the caller's point of view; the engine's own state machines only advance
/// when [`SipEngine::iterate`] is pumped, which the adapter does from a
/// background task for as long as it is initialized.
pub trait SipEngine: Send + Sync {
    /// Install the sink all engine callbacks are delivered through
    fn install_event_sink(&self, sink: EngineEventSink);

    /// Enable or disable the engine's own log collection
    ///
    /// The adapter disables it and re-routes engine logging through
    /// [`EngineEvent::Log`] instead.
    fn set_log_collection_enabled(&self, enabled: bool);

    /// Set the user-agent string presented in signaling
    fn set_user_agent(&self, user_agent: &str);

    /// Set or clear the ring tone reference
    fn set_ring_sound(&self, path: Option<&str>);

    /// Set the STUN server, or clear the NAT policy when `None`
    fn set_stun_server(&self, server: Option<&str>);

    /// Apply transport configuration (ports, TLS)
    fn apply_transport(&self, transport: TransportConfig) -> Result<(), EngineError>;

    /// Require SRTP for all media
    fn set_media_encryption_mandatory(&self, mandatory: bool) -> Result<(), EngineError>;

    /// Apply post-start tuning
    fn apply_tuning(&self, tuning: EngineTuning);

    /// Start the engine core
    fn start(&self) -> Result<(), EngineError>;

    /// Stop the engine core; must be safe even if never fully registered
    fn stop(&self);

    /// Pump the engine's internal event loop once
    fn iterate(&self);

    /// Place an outbound call
    fn invite(&self, uri: &str) -> Result<Arc<dyn EngineCall>, EngineError>;

    /// Best-effort global hangup
    fn terminate_all_calls(&self) -> Result<(), EngineError>;

    /// Create a registration binding for `identity` against `server_address`
    /// with auto-registration enabled
    fn create_account(
        &self,
        identity: &str,
        server_address: &str,
    ) -> Result<Arc<dyn EngineAccount>, EngineError>;

    /// Attach digest credentials used by subsequent registrations
    fn add_auth_info(&self, username: &str, password: &str);

    /// Drop all stored credentials
    fn clear_auth_info(&self);

    /// All registration bindings the engine currently knows
    fn accounts(&self) -> Vec<Arc<dyn EngineAccount>>;

    /// Remove one registration binding
    fn remove_account(&self, account: &Arc<dyn EngineAccount>);

    /// The engine's audio payload table
    fn audio_payload_types(&self) -> Vec<Arc<dyn EnginePayloadType>>;

    /// The engine's video payload table
    fn video_payload_types(&self) -> Vec<Arc<dyn EnginePayloadType>>;

    /// Enable or disable microphone capture
    fn set_mic_enabled(&self, enabled: bool);

    /// Whether microphone capture is enabled
    fn mic_enabled(&self) -> bool;
}

/// One registration binding (the engine's proxy/account object)
pub trait EngineAccount: Send + Sync {
    /// Identity URI this binding registers
    fn identity(&self) -> String;

    /// Current registration state of this binding
    fn registration_state(&self) -> EngineRegistrationState;

    /// Begin an edit transaction
    fn edit(&self);

    /// Toggle auto-registration; takes effect at [`EngineAccount::done`]
    fn set_register_enabled(&self, enabled: bool);

    /// Commit the edit transaction (initiates REGISTER / un-REGISTER)
    fn done(&self) -> Result<(), EngineError>;

    /// Trigger a re-REGISTER on an existing binding
    fn refresh_register(&self);
}

/// One negotiable codec in the engine payload table
pub trait EnginePayloadType: Send + Sync {
    /// MIME subtype of the codec (e.g. "PCMU", "opus")
    fn mime_type(&self) -> String;

    /// Sampling rate in Hz
    fn clock_rate(&self) -> u32;

    /// Channel count
    fn channels(&self) -> u8;

    /// Enable or disable this payload for negotiation
    fn set_enabled(&self, enabled: bool);

    /// Whether this payload is currently enabled
    fn enabled(&self) -> bool;
}

/// One engine call handle (one SIP dialog)
///
/// `handle_id` is the stable identity of the dialog: wrapping the same
/// engine call twice must yield the same id, since the public call model
/// compares by it.
pub trait EngineCall: Send + Sync {
    /// Stable identity of the underlying dialog
    fn handle_id(&self) -> u64;

    /// Remote party address; `None` means the call is not resolvable and
    /// must not be surfaced to the consumer
    fn remote_address(&self) -> Option<RemoteAddress>;

    /// Address the call was placed to
    fn to_address(&self) -> Option<RemoteAddress>;

    /// Current engine state of the call
    fn state(&self) -> CallState;

    /// Direction the dialog was established in
    fn direction(&self) -> CallDirection;

    /// Time the call has been running
    fn duration(&self) -> Duration;

    /// Instantaneous quality estimate, 0.0 to 5.0
    fn current_quality(&self) -> f32;

    /// Average quality estimate over the call, 0.0 to 5.0
    fn average_quality(&self) -> f32;

    /// Media encryption in use ("none", "srtp", ...), when known
    fn media_encryption(&self) -> Option<String>;

    fn accept(&self) -> Result<(), EngineError>;
    fn terminate(&self) -> Result<(), EngineError>;
    fn pause(&self) -> Result<(), EngineError>;
    fn resume(&self) -> Result<(), EngineError>;

    /// Blind transfer (REFER) to a target URI or number
    fn transfer(&self, target: &str) -> Result<(), EngineError>;

    /// Attended transfer: merge this call into `other`
    fn transfer_to_another(&self, other: &dyn EngineCall) -> Result<(), EngineError>;

    /// Send a single DTMF digit
    fn send_dtmf(&self, digit: char) -> Result<(), EngineError>;

    /// Send a DTMF digit sequence
    fn send_dtmfs(&self, digits: &str) -> Result<(), EngineError>;

    /// Read a header from the initial INVITE
    ///
    /// Engines do not retain these across state transitions; the router
    /// copies the designated identity headers into the custom set at
    /// `IncomingReceived` time.
    fn invite_header(&self, name: &str) -> Option<String>;

    /// Add a header to the call's outgoing parameter set
    fn add_custom_header(&self, name: &str, value: &str);

    /// Read a header from the call's outgoing parameter set
    fn custom_header(&self, name: &str) -> Option<String>;

    /// Call-log entry, present once the engine has recorded the call
    fn call_log(&self) -> Option<EngineCallLog>;

    /// Error detail when the call ended in the error state
    fn error_info(&self) -> Option<EngineErrorInfo>;

    /// Audio stream statistics, when media has run
    fn audio_stats(&self) -> Option<EngineAudioStats>;
}
