//! Codec reconciliation against the engine payload table
//!
//! The preference list is not state that accumulates: every application
//! walks the complete live payload table and decides each entry's enabled
//! flag from scratch. Applying the same list twice is a no-op, and a codec
//! missing from the engine table is silently skipped.

use crate::client::adapter::EngineAdapter;
use crate::config::Codec;

impl EngineAdapter {
    /// Enable exactly the codecs in `codecs`; disable everything else
    ///
    /// Video payloads are always disabled entirely. Matching is by MIME
    /// subtype, case-insensitive. An empty list disables all audio codecs.
    pub async fn set_audio_codecs(&self, codecs: &[Codec]) {
        for payload in self.engine().video_payload_types() {
            payload.set_enabled(false);
        }

        for payload in self.engine().audio_payload_types() {
            let mime = payload.mime_type();
            let enabled = codecs
                .iter()
                .any(|codec| codec.mime_type().eq_ignore_ascii_case(&mime));
            payload.set_enabled(enabled);
        }

        let names: Vec<String> = codecs.iter().map(Codec::to_string).collect();
        self.log(&format!("Enabled codecs: {}", names.join(", ")))
            .await;
    }

    /// Re-enable the full codec set
    pub async fn reset_audio_codecs(&self) {
        self.log("Resetting audio codecs.").await;
        self.set_audio_codecs(&Codec::ALL).await;
    }
}
