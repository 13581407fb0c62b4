//! Blind and attended call transfer
//!
//! Blind transfer is a single REFER on the existing call. Attended
//! transfer is two-phase: `begin_attended_transfer` places the
//! consultation call and hands back an [`AttendedTransferSession`]
//! pairing the two legs; `finish_attended_transfer` consumes the session
//! and asks the engine to merge them. The session is single-use by
//! construction - finishing takes it by value.

use crate::call::Call;
use crate::client::adapter::EngineAdapter;

/// One in-progress attended transfer
///
/// `from` is the original call (the party being transferred), `to` the
/// consultation call with the transfer target. Both fields are plain
/// calls; the consumer may hold, talk on, or abandon either leg before
/// finishing.
#[derive(Debug, Clone)]
pub struct AttendedTransferSession {
    /// The call being transferred away
    pub from: Call,
    /// The consultation call with the transfer target
    pub to: Call,
}

impl EngineAdapter {
    /// Blind transfer: REFER `call` to `target`
    pub async fn transfer(&self, call: &Call, target: &str) -> bool {
        match call.handle().transfer(target) {
            Ok(()) => true,
            Err(error) => {
                self.log(&format!("Unable to transfer call: {error}")).await;
                false
            }
        }
    }

    /// Start an attended transfer by calling the target
    ///
    /// On failure the original call is left untouched and `None` is
    /// returned; the consumer keeps talking on `from`.
    pub async fn begin_attended_transfer(
        &self,
        from: &Call,
        target: &str,
    ) -> Option<AttendedTransferSession> {
        let to = self.call(target).await?;
        Some(AttendedTransferSession {
            from: from.clone(),
            to,
        })
    }

    /// Merge the two legs of an attended transfer
    ///
    /// Consumes the session. Returns `false` without touching the engine
    /// when either leg has already terminated or left the active-call set;
    /// a stale session cannot trigger a transfer.
    pub async fn finish_attended_transfer(&self, session: AttendedTransferSession) -> bool {
        let AttendedTransferSession { from, to } = session;

        for call in [&from, &to] {
            if call.state().is_terminal() || !self.active_calls().contains_key(&call.id()) {
                self.log(&format!(
                    "Not finishing attended transfer, {} is no longer active.",
                    call.id()
                ))
                .await;
                return false;
            }
        }

        match from.handle().transfer_to_another(to.handle().as_ref()) {
            Ok(()) => true,
            Err(error) => {
                self.log(&format!("Unable to finish attended transfer: {error}"))
                    .await;
                false
            }
        }
    }
}
