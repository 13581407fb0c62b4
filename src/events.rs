//! Delegate traits and lifecycle events
//!
//! Every engine call-state transition is folded into one of the seven
//! lifecycle events of [`CallEvent`], and delivered to the registered
//! [`CallDelegate`] by a single dispatcher task. Delivery is sequential
//! on that one task, regardless of which thread the engine raised its
//! callback on; consumers can treat each delegate method as their single
//! designated execution context.
//!
//! # Usage Examples
//!
//! ```rust
//! use softphone_core::{Call, CallDelegate};
//!
//! struct Ui;
//!
//! #[async_trait::async_trait]
//! impl CallDelegate for Ui {
//!     async fn incoming_call_received(&self, call: Call) {
//!         println!("incoming call from {}", call.remote_number());
//!     }
//!     async fn outgoing_call_created(&self, _call: Call) {}
//!     async fn call_connected(&self, _call: Call) {}
//!     async fn call_updated(&self, _call: Call, message: String) {
//!         println!("call updated: {message}");
//!     }
//!     async fn call_ended(&self, _call: Call) {}
//!     async fn call_released(&self, _call: Call) {}
//!     async fn attended_transfer_merged(&self, _call: Call) {}
//! }
//! ```

use async_trait::async_trait;

use crate::call::Call;
use crate::registration::RegistrationState;

/// The fixed set of call lifecycle events
///
/// Everything the engine reports about a call collapses into exactly one
/// of these; there is no eighth event.
#[derive(Debug, Clone)]
pub enum CallEvent {
    /// A new outbound call was initialized by the engine
    OutgoingCallCreated(Call),
    /// An inbound INVITE arrived (identity headers already preserved)
    IncomingCallReceived(Call),
    /// The call reached the connected state
    CallConnected(Call),
    /// The call ended, normally or with an error
    ///
    /// Error detail, when present, is available via [`Call::error_info`];
    /// there is no separate error event.
    CallEnded(Call),
    /// Any other transition, with the engine's free-text message
    CallUpdated { call: Call, message: String },
    /// The engine released the call object; it is gone after this
    CallReleased(Call),
    /// An attended transfer merged; `Call` is the surviving call
    AttendedTransferMerged(Call),
}

/// Consumer delegate receiving the call lifecycle events
///
/// All methods are invoked sequentially from the library's dispatcher
/// task, so implementations never see two events for the same subject
/// concurrently or out of order.
#[async_trait]
pub trait CallDelegate: Send + Sync {
    /// An incoming call has been received
    async fn incoming_call_received(&self, call: Call);

    /// A new outgoing call was created
    async fn outgoing_call_created(&self, call: Call);

    /// A call is connected
    async fn call_connected(&self, call: Call);

    /// Generic update for transitions without a dedicated callback
    async fn call_updated(&self, call: Call, message: String);

    /// A call ended (including error endings)
    async fn call_ended(&self, call: Call);

    /// The call object was released by the engine
    async fn call_released(&self, call: Call);

    /// An attended transfer completed; the two calls have been merged.
    /// Fires before the ended/released events of the consumed call.
    async fn attended_transfer_merged(&self, call: Call);

    /// Unified dispatch; override only for custom routing
    async fn on_call_event(&self, event: CallEvent) {
        match event {
            CallEvent::OutgoingCallCreated(call) => self.outgoing_call_created(call).await,
            CallEvent::IncomingCallReceived(call) => self.incoming_call_received(call).await,
            CallEvent::CallConnected(call) => self.call_connected(call).await,
            CallEvent::CallEnded(call) => self.call_ended(call).await,
            CallEvent::CallUpdated { call, message } => self.call_updated(call, message).await,
            CallEvent::CallReleased(call) => self.call_released(call).await,
            CallEvent::AttendedTransferMerged(call) => {
                self.attended_transfer_merged(call).await
            }
        }
    }
}

/// Sink for free-text diagnostic lines
///
/// Engine-originated lines and the library's own lines arrive on separate
/// methods; both default to dropping the line, so implement only what the
/// application wants to surface.
pub trait LoggingDelegate: Send + Sync {
    /// A line from the engine's logging service
    fn on_engine_log(&self, _message: &str) {}

    /// A line from this library
    fn on_client_log(&self, _message: &str) {}
}

/// Single-shot callback for one registration attempt
///
/// Invoked exactly once with a terminal status (`Registered` or `Failed`),
/// then discarded. `FnOnce` makes the at-most-once property structural.
pub type RegistrationCallback = Box<dyn FnOnce(RegistrationState) + Send>;
