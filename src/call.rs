//! The public call model
//!
//! A [`Call`] is an immutable-identity, mutable-state wrapper around one
//! engine call handle. Its identity is the engine handle's identity, so the
//! same logical call compares equal no matter how many times it is
//! re-wrapped across state transitions. Everything else - state, duration,
//! quality, display fields - is derived from the live engine object on
//! access, never cached.
//!
//! A call is a transient view: the router re-derives it on every state
//! change, and it is semantically dead once the engine reports `Released`.
//! Do not store calls long-term; look them up again from the next delegate
//! event instead.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{EngineCall, EngineCallStatus, EngineErrorInfo, RemoteAddress};

/// Stable identity of one logical call
///
/// Equal to the underlying engine handle's identity, not a freshly
/// generated id, so repeated wraps of the same dialog compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(u64);

impl CallId {
    pub(crate) fn from_handle(handle: &dyn EngineCall) -> Self {
        Self(handle.handle_id())
    }

    /// Raw identity value, for logging and map keys
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

/// Call states, mirroring the engine's states 1:1
///
/// `Idle` is initial and `Released` is terminal. `Ended` and `Error` are
/// semantically terminal but are always followed by `Released` before the
/// call is dropped from the active-call set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallState {
    Idle,
    IncomingReceived,
    IncomingReceivedFromPush,
    OutgoingDidInitialize,
    OutgoingProgress,
    OutgoingRinging,
    OutgoingEarlyMedia,
    Connected,
    StreamsRunning,
    Pausing,
    Paused,
    Resuming,
    Referred,
    Error,
    Ended,
    PausedByRemote,
    UpdatedByRemote,
    IncomingEarlyMedia,
    Updating,
    Released,
    EarlyUpdatedByRemote,
    EarlyUpdating,
}

impl CallState {
    /// Whether the call can no longer carry media or signaling
    ///
    /// `Ended` and `Error` still await a final `Released` report.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Ended | CallState::Error | CallState::Released)
    }
}

/// Direction a call was established in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallDirection {
    Inbound,
    Outbound,
}

/// Current and average quality estimates for a call, 0.0 to 5.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallQuality {
    pub average: f32,
    pub current: f32,
}

/// One logical SIP dialog as seen by the consumer
///
/// Cheap to clone; clones share the underlying engine handle and compare
/// equal by handle identity.
#[derive(Clone)]
pub struct Call {
    id: CallId,
    handle: Arc<dyn EngineCall>,
}

impl Call {
    /// Wrap an engine call handle
    ///
    /// Returns `None` when the handle has no resolvable remote address; a
    /// call without one must never be surfaced to the consumer.
    pub(crate) fn from_engine(handle: Arc<dyn EngineCall>) -> Option<Self> {
        handle.remote_address()?;
        let id = CallId::from_handle(handle.as_ref());
        Some(Self { id, handle })
    }

    /// Stable identity of this call
    pub fn id(&self) -> CallId {
        self.id
    }

    pub(crate) fn handle(&self) -> &Arc<dyn EngineCall> {
        &self.handle
    }

    fn remote(&self) -> Option<RemoteAddress> {
        self.handle.remote_address()
    }

    /// Number (user part) of the remote party
    pub fn remote_number(&self) -> String {
        self.remote().map(|a| a.username).unwrap_or_default()
    }

    /// Display name of the remote party, when supplied
    pub fn display_name(&self) -> Option<String> {
        self.remote().and_then(|a| a.display_name)
    }

    /// Domain the remote party called from
    pub fn remote_environment(&self) -> String {
        self.remote().map(|a| a.domain).unwrap_or_default()
    }

    /// Current state, read live from the engine
    pub fn state(&self) -> CallState {
        self.handle.state()
    }

    /// Direction the call was established in
    pub fn direction(&self) -> CallDirection {
        self.handle.direction()
    }

    /// Whether this is an inbound call
    pub fn is_inbound(&self) -> bool {
        self.direction() == CallDirection::Inbound
    }

    /// How long the call has been running
    pub fn duration(&self) -> Duration {
        self.handle.duration()
    }

    /// Current and average quality estimates
    pub fn quality(&self) -> CallQuality {
        CallQuality {
            average: self.handle.average_quality(),
            current: self.handle.current_quality(),
        }
    }

    /// The preserved `Remote-Party-ID` header from the initial INVITE
    pub fn remote_party_id(&self) -> String {
        self.handle
            .custom_header("Remote-Party-ID")
            .unwrap_or_default()
    }

    /// The preserved `P-Asserted-Identity` header from the initial INVITE
    pub fn p_asserted_identity(&self) -> String {
        self.handle
            .custom_header("P-Asserted-Identity")
            .unwrap_or_default()
    }

    /// Whether this was an inbound call the local party never answered
    ///
    /// Computed from the engine call log: inbound direction plus a
    /// missed/aborted terminal status.
    pub fn was_missed(&self) -> bool {
        let Some(log) = self.handle.call_log() else {
            return false;
        };
        log.direction == CallDirection::Inbound
            && matches!(
                log.status,
                EngineCallStatus::Missed
                    | EngineCallStatus::Aborted
                    | EngineCallStatus::EarlyAborted
            )
    }

    /// Engine error detail when the call ended in the error state
    pub fn error_info(&self) -> Option<EngineErrorInfo> {
        self.handle.error_info()
    }
}

impl PartialEq for Call {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Call {}

impl std::hash::Hash for Call {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for Call {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Call")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("direction", &self.direction())
            .field("remote_number", &self.remote_number())
            .finish()
    }
}
