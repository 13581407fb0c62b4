//! Per-call actions facade
//!
//! An [`Actions`] value binds one call to the adapter, so consumers
//! operate on "the call" without threading both objects through their UI
//! layer. Obtain one from [`SoftphoneClient::actions`]; it is cheap to
//! clone and safe to hold for the life of the call.
//!
//! [`SoftphoneClient::actions`]: crate::SoftphoneClient::actions

use std::sync::Arc;

use crate::call::Call;
use crate::client::adapter::EngineAdapter;
use crate::client::info::call_info_report;
use crate::client::transfer::AttendedTransferSession;

/// All operations on one call
#[derive(Clone)]
pub struct Actions {
    adapter: Arc<EngineAdapter>,
    call: Call,
}

impl Actions {
    pub(crate) fn new(adapter: Arc<EngineAdapter>, call: Call) -> Self {
        Self { adapter, call }
    }

    /// The call these actions operate on
    pub fn call(&self) -> &Call {
        &self.call
    }

    /// Accept this incoming call
    pub async fn accept(&self) -> bool {
        self.adapter.accept_call(&self.call).await
    }

    /// Hang up this call
    pub async fn end(&self) -> bool {
        self.adapter.end_call(&self.call).await
    }

    /// Put this call on hold, or take it off hold
    pub async fn hold(&self, on_hold: bool) -> bool {
        self.adapter.set_hold(&self.call, on_hold).await
    }

    /// Blind transfer this call to `target`
    pub async fn transfer(&self, target: &str) -> bool {
        self.adapter.transfer(&self.call, target).await
    }

    /// Start an attended transfer from this call to `target`
    pub async fn begin_attended_transfer(
        &self,
        target: &str,
    ) -> Option<AttendedTransferSession> {
        self.adapter.begin_attended_transfer(&self.call, target).await
    }

    /// Merge the two legs of an attended transfer started on this call
    pub async fn finish_attended_transfer(&self, session: AttendedTransferSession) -> bool {
        self.adapter.finish_attended_transfer(session).await
    }

    /// Send DTMF on this call
    pub async fn send_dtmf(&self, dtmf: &str) -> bool {
        self.adapter.send_dtmf(&self.call, dtmf).await
    }

    /// Render the diagnostics report for this call
    pub fn call_info(&self) -> String {
        call_info_report(&self.call)
    }
}
