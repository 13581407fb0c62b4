//! Error types for the softphone-core library
//!
//! There are two layers of errors here, matching the two layers of the
//! library itself:
//!
//! - [`EngineError`] - faults raised by the SIP/RTP engine collaborator.
//!   These never escape the adapter: every engine-facing operation catches
//!   them and converts them to a boolean result plus a logged message.
//! - [`ClientError`] - typed failures surfaced to the consumer for the few
//!   operations that can fail in a way the consumer must react to
//!   (initialization, registration setup, unregister drain).

use thiserror::Error;

/// Result type for softphone client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur at the SIP/RTP engine boundary
///
/// The engine is an opaque collaborator; its faults carry a free-text
/// description and nothing more. The adapter absorbs these, so nothing
/// above the adapter ever needs to match on an engine-specific fault.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine core itself failed (start, stop, account creation)
    #[error("engine core failure: {0}")]
    Core(String),

    /// The engine rejected a per-call operation (invite, accept, transfer, ...)
    #[error("engine rejected operation: {0}")]
    Operation(String),
}

/// Errors surfaced to the consumer of the softphone client
#[derive(Debug, Error)]
pub enum ClientError {
    /// No configuration present when an operation requiring one was invoked
    #[error("no configuration provided")]
    NoConfiguration,

    /// The client has not been initialized (or initialization failed)
    #[error("client is not initialized")]
    NotInitialized,

    /// The engine could not be started during initialization
    ///
    /// Initialization is retryable after this error; the client is left
    /// uninitialized.
    #[error("engine failed to start: {reason}")]
    EngineStartFailed { reason: String },

    /// Registration setup failed before any REGISTER was sent
    #[error("registration setup failed: {reason}")]
    RegistrationSetupFailed { reason: String },

    /// The unregister drain never observed all accounts reaching cleared
    #[error("unregister did not complete within {seconds} seconds")]
    UnregisterTimeout { seconds: u64 },
}

impl ClientError {
    /// Create an engine-start error from an engine fault
    pub fn engine_start(error: &EngineError) -> Self {
        Self::EngineStartFailed {
            reason: error.to_string(),
        }
    }

    /// Create a registration-setup error from an engine fault
    pub fn registration_setup(error: &EngineError) -> Self {
        Self::RegistrationSetupFailed {
            reason: error.to_string(),
        }
    }
}
