//! The softphone client facade
//!
//! [`SoftphoneClient`] is the composition root: it owns the engine adapter
//! and exposes the whole public surface - lifecycle, registration, calls,
//! and per-call [`Actions`]. Construct it with any [`SipEngine`]
//! implementation; tests use the scripted engine from
//! [`crate::engine::mock`].
//!
//! [`SipEngine`]: crate::engine::SipEngine

pub(crate) mod adapter;
pub(crate) mod calls;
pub(crate) mod codecs;
pub(crate) mod info;
pub(crate) mod router;
pub(crate) mod transfer;

mod actions;

pub use actions::Actions;
pub use adapter::EngineAdapter;
pub use transfer::AttendedTransferSession;

use std::sync::Arc;

use crate::call::Call;
use crate::config::Config;
use crate::engine::SipEngine;
use crate::error::{ClientError, ClientResult};
use crate::registration::RegistrationState;

/// Mobile-grade softphone client over a pluggable SIP/RTP engine
///
/// Cheap to clone; clones share the same engine core and state.
///
/// # Usage Examples
///
/// ```rust,no_run
/// use softphone_core::{Auth, Config, SoftphoneClient};
/// use softphone_core::engine::mock::MockEngine;
/// # use softphone_core::{Call, CallDelegate};
/// # struct Ui;
/// # #[async_trait::async_trait]
/// # impl CallDelegate for Ui {
/// #     async fn incoming_call_received(&self, _call: Call) {}
/// #     async fn outgoing_call_created(&self, _call: Call) {}
/// #     async fn call_connected(&self, _call: Call) {}
/// #     async fn call_updated(&self, _call: Call, _message: String) {}
/// #     async fn call_ended(&self, _call: Call) {}
/// #     async fn call_released(&self, _call: Call) {}
/// #     async fn attended_transfer_merged(&self, _call: Call) {}
/// # }
/// # use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = SoftphoneClient::new(MockEngine::new());
///
/// let auth = Auth::new("alice", "secret", "sip.example.com", 5060);
/// client.initialize(Config::new(auth, Arc::new(Ui))).await?;
///
/// client.register(|state| println!("registration: {state}")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SoftphoneClient {
    adapter: Arc<EngineAdapter>,
}

impl SoftphoneClient {
    /// Create a client over `engine`; nothing starts until [`initialize`]
    ///
    /// [`initialize`]: SoftphoneClient::initialize
    pub fn new(engine: Arc<dyn SipEngine>) -> Self {
        Self {
            adapter: Arc::new(EngineAdapter::new(engine)),
        }
    }

    /// Bring the engine up under `config`
    ///
    /// Idempotent; see [`EngineAdapter::initialize`].
    pub async fn initialize(&self, config: Config) -> ClientResult<()> {
        self.adapter.initialize(config).await
    }

    /// Tear the engine down and rebuild it under the current configuration
    pub async fn refresh_config(&self) -> ClientResult<()> {
        let Some(config) = self.adapter.config().await else {
            return Err(ClientError::NoConfiguration);
        };
        self.adapter.destroy().await;
        self.adapter.initialize(config).await
    }

    /// Replace the configuration without restarting the engine core
    pub async fn swap_config(&self, config: Config) {
        self.adapter.swap_config(config).await;
    }

    /// Tear the engine down; safe at any point
    pub async fn destroy(&self) {
        self.adapter.destroy().await;
    }

    /// Whether the engine core is up
    pub fn is_initialized(&self) -> bool {
        self.adapter.is_initialized()
    }

    /// Whether the active identity is currently registered
    pub fn is_registered(&self) -> bool {
        self.adapter.registration().is_registered()
    }

    /// Initialized and registered: ready to place and receive calls
    pub fn is_ready(&self) -> bool {
        self.is_initialized() && self.is_registered()
    }

    /// Start one registration attempt
    ///
    /// `callback` fires exactly once, with `Registered` or `Failed`;
    /// intermediate progress is never reported through it. Calling again
    /// while a binding exists refreshes it instead of duplicating it.
    pub async fn register(
        &self,
        callback: impl FnOnce(RegistrationState) + Send + 'static,
    ) -> ClientResult<()> {
        if !self.adapter.is_initialized() {
            return Err(ClientError::NotInitialized);
        }
        let Some(config) = self.adapter.config().await else {
            return Err(ClientError::NoConfiguration);
        };
        self.adapter.registration().register(
            self.adapter.engine().as_ref(),
            &config,
            Box::new(callback),
        )
    }

    /// Remove the registration binding, waiting for the engine to clear it
    ///
    /// Immediately succeeds when the engine was never initialized. The wait
    /// is bounded; see [`crate::ClientError::UnregisterTimeout`].
    pub async fn unregister(&self) -> ClientResult<()> {
        if !self.adapter.is_initialized() {
            return Ok(());
        }
        self.adapter
            .registration()
            .unregister(self.adapter.engine().as_ref())
            .await
    }

    /// Place an outbound call; `None` when refused
    pub async fn call(&self, number: &str) -> Option<Call> {
        self.adapter.call(number).await
    }

    /// Best-effort hangup of every active call
    pub async fn terminate_all_calls(&self) {
        self.adapter.terminate_all_calls().await;
    }

    /// Actions bound to one call
    pub fn actions(&self, call: Call) -> Actions {
        Actions::new(self.adapter.clone(), call)
    }

    /// Merge the two legs of an attended transfer
    pub async fn finish_attended_transfer(&self, session: AttendedTransferSession) -> bool {
        self.adapter.finish_attended_transfer(session).await
    }

    /// Mute or unmute microphone capture
    pub fn set_microphone_muted(&self, muted: bool) {
        self.adapter.engine().set_mic_enabled(!muted);
    }

    /// Whether microphone capture is muted
    pub fn is_microphone_muted(&self) -> bool {
        !self.adapter.engine().mic_enabled()
    }

    /// Re-apply the configured codec preference list
    pub async fn apply_codecs(&self) {
        if let Some(config) = self.adapter.config().await {
            self.adapter.set_audio_codecs(&config.codecs).await;
        }
    }

    /// Re-enable the full codec set
    pub async fn reset_codecs(&self) {
        self.adapter.reset_audio_codecs().await;
    }
}
