//! Event router: folds engine events into delegate callbacks
//!
//! One router task per initialized adapter drains the engine event channel
//! in order and dispatches the matching delegate callback, awaiting each
//! one before taking the next event. That single task is the library's
//! ordering guarantee: consumers never observe events for one call out of
//! order or concurrently.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::RwLock;

use crate::call::{Call, CallId, CallState};
use crate::config::Config;
use crate::engine::{EngineCall, EngineEvent};
use crate::events::CallEvent;
use crate::registration::RegistrationCoordinator;

/// INVITE headers copied into the call's custom set on arrival
///
/// Engines drop initial-INVITE headers on the first re-INVITE; copying
/// these at `IncomingReceived` time keeps the caller identity readable for
/// the rest of the call.
pub(crate) const PRESERVED_HEADERS: [&str; 2] = ["Remote-Party-ID", "P-Asserted-Identity"];

/// Consumes the engine event channel and drives the delegate
pub(crate) struct CallEventRouter {
    config: Arc<RwLock<Option<Config>>>,
    registration: Arc<RegistrationCoordinator>,
    active_calls: Arc<DashMap<CallId, Arc<dyn EngineCall>>>,
    /// Calls a `CallReleased` has already been dispatched for
    released: DashSet<CallId>,
}

impl CallEventRouter {
    pub(crate) fn new(
        config: Arc<RwLock<Option<Config>>>,
        registration: Arc<RegistrationCoordinator>,
        active_calls: Arc<DashMap<CallId, Arc<dyn EngineCall>>>,
    ) -> Self {
        Self {
            config,
            registration,
            active_calls,
            released: DashSet::new(),
        }
    }

    /// Drain the channel until the sender side is dropped
    pub(crate) async fn run(self, mut rx: UnboundedReceiver<EngineEvent>) {
        while let Some(event) = rx.recv().await {
            self.route(event).await;
        }
    }

    async fn route(&self, event: EngineEvent) {
        match event {
            EngineEvent::Log { message } => {
                if let Some(config) = self.config.read().await.as_ref() {
                    if let Some(delegate) = &config.logging_delegate {
                        delegate.on_engine_log(&message);
                    }
                }
            }
            EngineEvent::RegistrationStateChanged { state, message } => {
                tracing::debug!(?state, %message, "registration state changed");
                self.registration.handle_engine_state(state);
            }
            EngineEvent::CallStateChanged {
                call,
                state,
                message,
            } => {
                self.route_call_state(call, state, message).await;
            }
            EngineEvent::TransferStateChanged { call, state } => {
                tracing::debug!(?state, "transfer state changed");
                if let Some(call) = Call::from_engine(call) {
                    self.dispatch(CallEvent::AttendedTransferMerged(call)).await;
                }
            }
        }
    }

    async fn route_call_state(
        &self,
        handle: Arc<dyn EngineCall>,
        state: CallState,
        message: String,
    ) {
        let Some(call) = Call::from_engine(handle.clone()) else {
            // A call we cannot attribute to a remote party is unanswerable
            // noise; hang it up and tell the consumer nothing.
            tracing::warn!(?state, "dropping call without remote address");
            if let Err(error) = handle.terminate() {
                tracing::warn!(%error, "failed to terminate unattributable call");
            }
            return;
        };

        tracing::debug!(id = %call.id(), ?state, %message, "call state changed");

        if state != CallState::Released {
            self.active_calls.insert(call.id(), handle);
        }

        let event = match state {
            CallState::OutgoingDidInitialize => CallEvent::OutgoingCallCreated(call),
            CallState::IncomingReceived => {
                self.preserve_headers(&call);
                CallEvent::IncomingCallReceived(call)
            }
            CallState::Connected => CallEvent::CallConnected(call),
            CallState::Ended | CallState::Error => CallEvent::CallEnded(call),
            CallState::Released => {
                // At most one released event per call, no matter how often
                // the engine repeats itself.
                if !self.released.insert(call.id()) {
                    return;
                }
                self.active_calls.remove(&call.id());
                CallEvent::CallReleased(call)
            }
            _ => CallEvent::CallUpdated { call, message },
        };

        self.dispatch(event).await;
    }

    fn preserve_headers(&self, call: &Call) {
        for name in PRESERVED_HEADERS {
            if let Some(value) = call.handle().invite_header(name) {
                call.handle().add_custom_header(name, &value);
            }
        }
    }

    async fn dispatch(&self, event: CallEvent) {
        // Read the delegate per event so a config swap takes effect for
        // everything dispatched after it.
        let delegate = match self.config.read().await.as_ref() {
            Some(config) => config.call_delegate.clone(),
            None => {
                tracing::warn!("no configuration; dropping call event");
                return;
            }
        };
        delegate.on_call_event(event).await;
    }
}
