//! # softphone-core
//!
//! Call and registration lifecycle coordination over a pluggable SIP/RTP
//! engine.
//!
//! This library is the mobile-grade control layer of a softphone: it does
//! not speak SIP or move RTP itself, it drives an engine that does
//! (anything implementing [`engine::SipEngine`]) and turns the engine's
//! many callbacks into a small, ordered, thread-safe surface:
//!
//! - **One client** - [`SoftphoneClient`] owns the engine core, brings it
//!   up and down, and hot-swaps configuration without a restart.
//! - **One event stream** - every engine callback is funneled through a
//!   single ordered channel and dispatched sequentially to the consumer's
//!   [`CallDelegate`], collapsing all call transitions into seven
//!   lifecycle events.
//! - **One registration at a time** - `register` takes a single-shot
//!   callback that fires exactly once with `Registered` or `Failed`;
//!   re-registering refreshes the existing binding instead of duplicating
//!   it, and `unregister` waits (bounded) for the engine to clear it.
//! - **Per-call actions** - accept, hang up, hold, DTMF, blind and
//!   two-phase attended transfer, and a plain-text diagnostics report,
//!   all behind [`Actions`].
//! - **Idempotent codec control** - the configured preference list is
//!   reconciled against the engine's live payload table from scratch on
//!   every application.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use softphone_core::engine::mock::MockEngine;
//! use softphone_core::{Auth, Call, CallDelegate, Codec, Config, SoftphoneClient};
//!
//! struct Ui;
//!
//! #[async_trait::async_trait]
//! impl CallDelegate for Ui {
//!     async fn incoming_call_received(&self, call: Call) {
//!         println!("ring ring: {}", call.remote_number());
//!     }
//!     async fn outgoing_call_created(&self, _call: Call) {}
//!     async fn call_connected(&self, _call: Call) {}
//!     async fn call_updated(&self, _call: Call, _message: String) {}
//!     async fn call_ended(&self, _call: Call) {}
//!     async fn call_released(&self, _call: Call) {}
//!     async fn attended_transfer_merged(&self, _call: Call) {}
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Swap MockEngine for a real engine binding in production.
//!     let client = SoftphoneClient::new(MockEngine::new());
//!
//!     let auth = Auth::new("alice", "secret", "sip.example.com", 5060);
//!     let config = Config::new(auth, Arc::new(Ui))
//!         .with_codecs(vec![Codec::Opus, Codec::G722]);
//!     client.initialize(config).await?;
//!
//!     client.register(|state| println!("registration: {state}")).await?;
//!
//!     if let Some(call) = client.call("sip:100@sip.example.com").await {
//!         let actions = client.actions(call);
//!         actions.send_dtmf("1").await;
//!         actions.end().await;
//!     }
//!
//!     client.unregister().await?;
//!     client.destroy().await;
//!     Ok(())
//! }
//! ```

pub mod call;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod registration;

pub use call::{Call, CallDirection, CallId, CallQuality, CallState};
pub use client::{Actions, AttendedTransferSession, EngineAdapter, SoftphoneClient};
pub use config::{Auth, Codec, Config};
pub use error::{ClientError, ClientResult, EngineError};
pub use events::{CallDelegate, CallEvent, LoggingDelegate, RegistrationCallback};
pub use registration::RegistrationState;
