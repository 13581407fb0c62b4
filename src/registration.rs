//! Registration state machine and coordinator
//!
//! The coordinator drives one SIP identity through register, re-register
//! and unregister against the engine adapter, and owns the single-shot
//! callback of the in-flight registration attempt.
//!
//! # State Transitions
//!
//! `Progress` resolves to `Registered` or `Failed`; either of those moves
//! to `Cleared` on unregister; any state may re-enter `Progress` on a
//! re-register. The stored callback fires exactly once, on the first
//! terminal state observed for the attempt - intermediate `Progress`
//! events and late duplicate engine events never re-invoke it.
//!
//! # Usage Examples
//!
//! ```rust
//! use softphone_core::RegistrationState;
//!
//! let state = RegistrationState::Registered;
//! assert!(state.is_terminal());
//! assert_eq!(state.to_string(), "Registered");
//! assert!(!RegistrationState::Progress.is_terminal());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::engine::{EngineRegistrationState, SipEngine, TransportConfig};
use crate::error::{ClientError, ClientResult};
use crate::events::RegistrationCallback;

/// Public registration status of the active identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationState {
    /// No registration attempt has been made
    None,
    /// A REGISTER is in flight
    Progress,
    /// The registrar accepted the registration
    Registered,
    /// The registrar rejected the registration; not retried automatically
    Failed,
    /// The binding was removed by an unregister
    Cleared,
}

impl RegistrationState {
    /// Whether this status consumes the single-shot registration callback
    pub fn is_terminal(&self) -> bool {
        matches!(self, RegistrationState::Registered | RegistrationState::Failed)
    }
}

impl std::fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationState::None => write!(f, "None"),
            RegistrationState::Progress => write!(f, "Progress"),
            RegistrationState::Registered => write!(f, "Registered"),
            RegistrationState::Failed => write!(f, "Failed"),
            RegistrationState::Cleared => write!(f, "Cleared"),
        }
    }
}

impl From<EngineRegistrationState> for RegistrationState {
    fn from(state: EngineRegistrationState) -> Self {
        match state {
            EngineRegistrationState::None => RegistrationState::None,
            EngineRegistrationState::Progress => RegistrationState::Progress,
            EngineRegistrationState::Ok => RegistrationState::Registered,
            EngineRegistrationState::Failed => RegistrationState::Failed,
            EngineRegistrationState::Cleared => RegistrationState::Cleared,
        }
    }
}

/// How long the unregister drain waits for every binding to clear
pub(crate) const UNREGISTER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pump step used while draining
const DRAIN_STEP: Duration = Duration::from_millis(50);

/// Drives register/unregister and owns the single-shot callback
pub(crate) struct RegistrationCoordinator {
    /// Callback of the in-flight attempt; `take()` enforces at-most-once
    callback: Mutex<Option<RegistrationCallback>>,
    registered: AtomicBool,
}

impl RegistrationCoordinator {
    pub(crate) fn new() -> Self {
        Self {
            callback: Mutex::new(None),
            registered: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    /// Start one registration attempt
    ///
    /// When a binding already exists this triggers a refresh (re-REGISTER)
    /// instead of creating a second binding, so repeated `register` calls
    /// never produce duplicate proxy entries. Otherwise transport and
    /// encryption are applied from the configuration, credentials are
    /// attached, and a fresh binding with auto-registration is created.
    pub(crate) fn register(
        &self,
        engine: &dyn SipEngine,
        config: &Config,
        callback: RegistrationCallback,
    ) -> ClientResult<()> {
        // Arm before touching the engine so a terminal event arriving
        // during setup is never lost; disarm again on setup failure.
        *self.callback.lock().unwrap() = Some(callback);

        if let Some(account) = engine.accounts().into_iter().next() {
            tracing::debug!(identity = %account.identity(), "refreshing existing registration");
            account.refresh_register();
            return Ok(());
        }

        let result = self.create_binding(engine, config);
        if let Err(ref error) = result {
            tracing::warn!(%error, "registration setup failed");
            self.callback.lock().unwrap().take();
        }
        result
    }

    fn create_binding(&self, engine: &dyn SipEngine, config: &Config) -> ClientResult<()> {
        let auth = &config.auth;

        engine
            .apply_transport(TransportConfig {
                port: auth.port,
                encryption: config.encryption,
            })
            .map_err(|e| ClientError::registration_setup(&e))?;

        if config.encryption {
            engine
                .set_media_encryption_mandatory(true)
                .map_err(|e| ClientError::registration_setup(&e))?;
        }

        engine.add_auth_info(&auth.name, &auth.password);

        let identity = auth.identity();
        let server = if config.encryption {
            format!("sip:{};transport=tls", auth.domain)
        } else {
            format!("sip:{}", auth.domain)
        };

        engine
            .create_account(&identity, &server)
            .map_err(|e| ClientError::registration_setup(&e))?;

        tracing::info!(%identity, "registering");
        Ok(())
    }

    /// Feed one engine registration event into the state machine
    ///
    /// Updates the registered flag and, only on a terminal status, fires
    /// and discards the stored callback.
    pub(crate) fn handle_engine_state(&self, state: EngineRegistrationState) {
        match state {
            EngineRegistrationState::Ok => self.registered.store(true, Ordering::SeqCst),
            EngineRegistrationState::Failed | EngineRegistrationState::Cleared => {
                self.registered.store(false, Ordering::SeqCst)
            }
            _ => {}
        }

        let status = RegistrationState::from(state);
        if status.is_terminal() {
            if let Some(callback) = self.callback.lock().unwrap().take() {
                callback(status);
            }
        }
    }

    /// Disable every binding, drain until all report cleared, then remove them
    ///
    /// Runs off the interactive path; the drain pumps the engine itself
    /// because the engine only advances its state machine when iterated.
    /// The wait is bounded: if the engine never clears every binding within
    /// [`UNREGISTER_DRAIN_TIMEOUT`], an `UnregisterTimeout` is surfaced and
    /// the bindings are left in place.
    pub(crate) async fn unregister(&self, engine: &dyn SipEngine) -> ClientResult<()> {
        for account in engine.accounts() {
            account.edit();
            account.set_register_enabled(false);
            if let Err(error) = account.done() {
                tracing::warn!(%error, identity = %account.identity(), "unregister edit failed");
            }
        }

        self.registered.store(false, Ordering::SeqCst);

        let deadline = tokio::time::Instant::now() + UNREGISTER_DRAIN_TIMEOUT;
        loop {
            let all_cleared = engine
                .accounts()
                .iter()
                .all(|a| a.registration_state() == EngineRegistrationState::Cleared);
            if all_cleared {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ClientError::UnregisterTimeout {
                    seconds: UNREGISTER_DRAIN_TIMEOUT.as_secs(),
                });
            }
            // Make sure we receive callbacks before tearing the bindings down.
            engine.iterate();
            tokio::time::sleep(DRAIN_STEP).await;
        }

        for account in engine.accounts() {
            engine.remove_account(&account);
        }
        engine.clear_auth_info();
        tracing::info!("unregistered");
        Ok(())
    }

    /// Drop the registered flag and any stale callback
    pub(crate) fn clear(&self) {
        self.registered.store(false, Ordering::SeqCst);
        self.callback.lock().unwrap().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn engine_states_map_onto_public_states() {
        assert_eq!(
            RegistrationState::from(EngineRegistrationState::Ok),
            RegistrationState::Registered
        );
        assert_eq!(
            RegistrationState::from(EngineRegistrationState::Cleared),
            RegistrationState::Cleared
        );
    }

    #[test]
    fn callback_fires_once_despite_repeated_terminal_events() {
        let coordinator = RegistrationCoordinator::new();
        let fired = Arc::new(std::sync::Mutex::new(Vec::new()));

        let sink = fired.clone();
        *coordinator.callback.lock().unwrap() =
            Some(Box::new(move |state| sink.lock().unwrap().push(state)));

        coordinator.handle_engine_state(EngineRegistrationState::Progress);
        coordinator.handle_engine_state(EngineRegistrationState::Progress);
        coordinator.handle_engine_state(EngineRegistrationState::Ok);
        coordinator.handle_engine_state(EngineRegistrationState::Ok);
        coordinator.handle_engine_state(EngineRegistrationState::Failed);

        assert_eq!(&*fired.lock().unwrap(), &[RegistrationState::Registered]);
        // The Failed after the attempt resolved still drops the flag.
        assert!(!coordinator.is_registered());
    }

    #[test]
    fn progress_alone_never_fires_the_callback() {
        let coordinator = RegistrationCoordinator::new();
        let fired = Arc::new(std::sync::Mutex::new(Vec::new()));

        let sink = fired.clone();
        *coordinator.callback.lock().unwrap() =
            Some(Box::new(move |state| sink.lock().unwrap().push(state)));

        coordinator.handle_engine_state(EngineRegistrationState::Progress);
        coordinator.handle_engine_state(EngineRegistrationState::None);

        assert!(fired.lock().unwrap().is_empty());
        assert!(!coordinator.is_registered());
    }
}
