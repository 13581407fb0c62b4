//! Configuration for the softphone client
//!
//! A [`Config`] is an immutable snapshot of everything the client needs to
//! drive one SIP identity: the credentials, the delegate that receives call
//! lifecycle events, transport/encryption options, and the ordered codec
//! preference list. The active configuration can be hot-swapped on a running
//! client without destroying the engine core; the next `register` then uses
//! the new auth and codecs.
//!
//! # Usage Examples
//!
//! ```rust
//! use softphone_core::{Auth, Codec, Config, Call, CallDelegate};
//! use std::sync::Arc;
//!
//! struct MyDelegate;
//!
//! #[async_trait::async_trait]
//! impl CallDelegate for MyDelegate {
//!     async fn incoming_call_received(&self, _call: Call) {}
//!     async fn outgoing_call_created(&self, _call: Call) {}
//!     async fn call_connected(&self, _call: Call) {}
//!     async fn call_updated(&self, _call: Call, _message: String) {}
//!     async fn call_ended(&self, _call: Call) {}
//!     async fn call_released(&self, _call: Call) {}
//!     async fn attended_transfer_merged(&self, _call: Call) {}
//! }
//!
//! let auth = Auth::new("alice", "secret", "sip.example.com", 5060);
//! let config = Config::new(auth, Arc::new(MyDelegate))
//!     .with_encryption(false)
//!     .with_stun("stun.example.com")
//!     .with_codecs(vec![Codec::Opus, Codec::G722]);
//!
//! assert_eq!(config.codecs, vec![Codec::Opus, Codec::G722]);
//! assert!(!config.encryption);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::events::{CallDelegate, LoggingDelegate};

/// SIP identity and credentials for one registration attempt
///
/// Immutable value; supplied once per registration attempt and never
/// mutated. Swap the whole [`Config`] to re-register as a different
/// identity.
///
/// # Examples
///
/// ```rust
/// use softphone_core::Auth;
///
/// let auth = Auth::new("alice", "secret", "sip.example.com", 5060);
/// assert_eq!(auth.identity(), "sip:alice@sip.example.com:5060");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    /// SIP account name (the user part of the identity URI)
    pub name: String,
    /// Password for digest authentication
    pub password: String,
    /// Domain of the registrar (also used as the proxy server address)
    pub domain: String,
    /// Port of the registrar
    pub port: u16,
}

impl Auth {
    /// Create a new set of credentials
    pub fn new(
        name: impl Into<String>,
        password: impl Into<String>,
        domain: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            domain: domain.into(),
            port,
        }
    }

    /// The identity URI this auth registers as
    pub fn identity(&self) -> String {
        format!("sip:{}@{}:{}", self.name, self.domain, self.port)
    }
}

/// Audio codec preference
///
/// Drawn from the fixed set of payload types the engine knows about.
/// A codec list is not persisted state; it is applied idempotently against
/// the engine's live payload table on every (re)configuration.
///
/// # Examples
///
/// ```rust
/// use softphone_core::Codec;
///
/// assert_eq!(Codec::Opus.mime_type(), "OPUS");
/// assert_eq!(Codec::ALL.len(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Codec {
    Gsm,
    G722,
    L16,
    Opus,
    Pcmu,
    Pcma,
    Speex,
}

impl Codec {
    /// Every codec the engine payload table can carry
    pub const ALL: [Codec; 7] = [
        Codec::Gsm,
        Codec::G722,
        Codec::L16,
        Codec::Opus,
        Codec::Pcmu,
        Codec::Pcma,
        Codec::Speex,
    ];

    /// MIME subtype used to match this codec against engine payload types
    ///
    /// Matching is case-insensitive, so the exact casing the engine reports
    /// does not matter.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Codec::Gsm => "GSM",
            Codec::G722 => "G722",
            Codec::L16 => "L16",
            Codec::Opus => "OPUS",
            Codec::Pcmu => "PCMU",
            Codec::Pcma => "PCMA",
            Codec::Speex => "SPEEX",
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mime_type())
    }
}

/// Immutable configuration snapshot for the softphone client
///
/// Holds the auth, the consumer delegates, and all engine-facing options.
/// Built with [`Config::new`] plus `with_*` builders.
#[derive(Clone)]
pub struct Config {
    /// Identity and credentials used by the next `register`
    pub auth: Auth,
    /// Delegate receiving the call lifecycle events
    pub call_delegate: Arc<dyn CallDelegate>,
    /// Whether to use TLS transport and mandatory SRTP media encryption
    pub encryption: bool,
    /// Optional STUN server; when absent the engine NAT policy is cleared
    pub stun: Option<String>,
    /// Optional ring tone reference handed to the engine
    pub ring_sound: Option<String>,
    /// Ordered codec preferences, reconciled against the engine payload table
    pub codecs: Vec<Codec>,
    /// User-agent string the engine presents in signaling
    pub user_agent: String,
    /// Optional sink for engine and client diagnostic log lines
    pub logging_delegate: Option<Arc<dyn LoggingDelegate>>,
}

impl Config {
    /// Create a configuration with the default options
    ///
    /// Defaults mirror a production softphone: encryption on, OPUS only,
    /// no STUN, no ring tone.
    pub fn new(auth: Auth, call_delegate: Arc<dyn CallDelegate>) -> Self {
        Self {
            auth,
            call_delegate,
            encryption: true,
            stun: None,
            ring_sound: None,
            codecs: vec![Codec::Opus],
            user_agent: "softphone-core".to_string(),
            logging_delegate: None,
        }
    }

    /// Enable or disable TLS transport and mandatory SRTP
    pub fn with_encryption(mut self, encryption: bool) -> Self {
        self.encryption = encryption;
        self
    }

    /// Set the STUN server used by the engine NAT policy
    pub fn with_stun(mut self, stun: impl Into<String>) -> Self {
        self.stun = Some(stun.into());
        self
    }

    /// Set the ring tone reference
    pub fn with_ring_sound(mut self, ring_sound: impl Into<String>) -> Self {
        self.ring_sound = Some(ring_sound.into());
        self
    }

    /// Set the ordered codec preference list
    pub fn with_codecs(mut self, codecs: Vec<Codec>) -> Self {
        self.codecs = codecs;
        self
    }

    /// Set the user-agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the log sink for diagnostic lines
    pub fn with_logging_delegate(mut self, delegate: Arc<dyn LoggingDelegate>) -> Self {
        self.logging_delegate = Some(delegate);
        self
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("auth", &self.auth)
            .field("call_delegate", &"<delegate>")
            .field("encryption", &self.encryption)
            .field("stun", &self.stun)
            .field("ring_sound", &self.ring_sound)
            .field("codecs", &self.codecs)
            .field("user_agent", &self.user_agent)
            .field(
                "logging_delegate",
                &self.logging_delegate.as_ref().map(|_| "<delegate>"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_builds_identity_uri() {
        let auth = Auth::new("alice", "secret", "sip.example.com", 5061);
        assert_eq!(auth.identity(), "sip:alice@sip.example.com:5061");
    }

    #[test]
    fn codec_mime_types_are_stable() {
        assert_eq!(Codec::Pcmu.mime_type(), "PCMU");
        assert_eq!(Codec::Opus.to_string(), "OPUS");
        assert!(Codec::ALL.contains(&Codec::Speex));
    }
}
