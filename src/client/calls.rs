//! Call control operations on the engine adapter
//!
//! These are the imperative verbs: place, accept, hang up, hold, DTMF.
//! All of them return plainly (`Option`/`bool`) rather than erroring; a
//! refused operation is logged and the consumer reacts to the lifecycle
//! events that do or do not follow.

use crate::call::Call;
use crate::client::adapter::EngineAdapter;

impl EngineAdapter {
    /// Place an outbound call to `number`
    ///
    /// Returns the new call, or `None` when the adapter is uninitialized
    /// or the engine refused the invite. The corresponding
    /// `outgoing_call_created` event follows via the delegate.
    pub async fn call(&self, number: &str) -> Option<Call> {
        if !self.is_initialized() {
            self.log("Not calling, engine is not initialized.").await;
            return None;
        }

        let handle = match self.engine().invite(number) {
            Ok(handle) => handle,
            Err(error) => {
                self.log(&format!("Unable to start call: {error}")).await;
                return None;
            }
        };

        let Some(call) = Call::from_engine(handle.clone()) else {
            self.log("Engine returned a call without a remote address.")
                .await;
            return None;
        };

        self.active_calls().insert(call.id(), handle);
        Some(call)
    }

    /// Accept an incoming call
    pub async fn accept_call(&self, call: &Call) -> bool {
        match call.handle().accept() {
            Ok(()) => true,
            Err(error) => {
                self.log(&format!("Unable to accept call: {error}")).await;
                false
            }
        }
    }

    /// Hang up one call
    pub async fn end_call(&self, call: &Call) -> bool {
        match call.handle().terminate() {
            Ok(()) => true,
            Err(error) => {
                self.log(&format!("Unable to end call: {error}")).await;
                false
            }
        }
    }

    /// Put a call on hold, or take it off hold
    pub async fn set_hold(&self, call: &Call, on_hold: bool) -> bool {
        let result = if on_hold {
            self.log("Pausing call.").await;
            call.handle().pause()
        } else {
            self.log("Resuming call.").await;
            call.handle().resume()
        };
        match result {
            Ok(()) => true,
            Err(error) => {
                self.log(&format!("Unable to change hold state: {error}"))
                    .await;
                false
            }
        }
    }

    /// Send DTMF on a call
    ///
    /// A single character goes out as one digit event; longer input is sent
    /// as a paced sequence.
    pub async fn send_dtmf(&self, call: &Call, dtmf: &str) -> bool {
        let mut chars = dtmf.chars();
        let result = match (chars.next(), chars.next()) {
            (Some(digit), None) => call.handle().send_dtmf(digit),
            (Some(_), Some(_)) => call.handle().send_dtmfs(dtmf),
            (None, _) => return false,
        };
        match result {
            Ok(()) => true,
            Err(error) => {
                self.log(&format!("Unable to send dtmf: {error}")).await;
                false
            }
        }
    }

    /// Best-effort hangup of every active call
    pub async fn terminate_all_calls(&self) {
        if let Err(error) = self.engine().terminate_all_calls() {
            self.log(&format!("Unable to terminate all calls: {error}"))
                .await;
        }
    }
}
