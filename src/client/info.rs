//! Human-readable call diagnostics report
//!
//! Flattens everything the engine knows about one call - audio stats,
//! addresses, media parameters, log entry, error detail - into a sorted
//! plain-text report suitable for a support ticket or a debug overlay.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::call::Call;

/// Render the diagnostics report for `call`
pub(crate) fn call_info_report(call: &Call) -> String {
    let mut sections: BTreeMap<&str, Map<String, Value>> = BTreeMap::new();

    let mut audio = Map::new();
    if let Some(stats) = call.handle().audio_stats() {
        audio.insert("codec".into(), json!(stats.codec_mime_type));
        audio.insert("codecChannels".into(), json!(stats.codec_channels));
        audio.insert("downloadBandwidth".into(), json!(stats.download_bandwidth));
        audio.insert("uploadBandwidth".into(), json!(stats.upload_bandwidth));
        audio.insert(
            "jitterBufferSizeMs".into(),
            json!(stats.jitter_buffer_size_ms),
        );
        audio.insert("localLossRate".into(), json!(stats.local_loss_rate));
        audio.insert("localLateRate".into(), json!(stats.local_late_rate));
        audio.insert("receiverLossRate".into(), json!(stats.receiver_loss_rate));
        audio.insert("senderLossRate".into(), json!(stats.sender_loss_rate));
        audio.insert(
            "receiverInterarrivalJitter".into(),
            json!(stats.receiver_interarrival_jitter),
        );
        audio.insert(
            "senderInterarrivalJitter".into(),
            json!(stats.sender_interarrival_jitter),
        );
        audio.insert("roundTripDelay".into(), json!(stats.round_trip_delay));
        audio.insert(
            "rtcpDownloadBandwidth".into(),
            json!(stats.rtcp_download_bandwidth),
        );
        audio.insert(
            "rtcpUploadBandwidth".into(),
            json!(stats.rtcp_upload_bandwidth),
        );
    }
    sections.insert("Audio", audio);

    let mut to = Map::new();
    if let Some(address) = call.handle().to_address() {
        to.insert("username".into(), json!(address.username));
        to.insert("domain".into(), json!(address.domain));
        to.insert("displayName".into(), json!(address.display_name));
        to.insert("transport".into(), json!(address.transport));
    }
    sections.insert("To Address", to);

    let mut params = Map::new();
    params.insert(
        "encryption".into(),
        json!(call.handle().media_encryption()),
    );
    params.insert("remotePartyId".into(), json!(call.remote_party_id()));
    params.insert(
        "pAssertedIdentity".into(),
        json!(call.p_asserted_identity()),
    );
    sections.insert("Params", params);

    let mut info = Map::new();
    info.insert("state".into(), json!(format!("{:?}", call.state())));
    info.insert(
        "direction".into(),
        json!(format!("{:?}", call.direction())),
    );
    info.insert("durationSecs".into(), json!(call.duration().as_secs()));
    let quality = call.quality();
    info.insert("averageQuality".into(), json!(quality.average));
    info.insert("currentQuality".into(), json!(quality.current));
    if let Some(log) = call.handle().call_log() {
        info.insert("callId".into(), json!(log.call_id));
        info.insert("status".into(), json!(format!("{:?}", log.status)));
        info.insert("startDate".into(), json!(log.start_date.to_rfc3339()));
        info.insert("refKey".into(), json!(log.ref_key));
    }
    sections.insert("Call", info);

    let mut error = Map::new();
    if let Some(detail) = call.error_info() {
        error.insert("reason".into(), json!(detail.reason));
        error.insert("phrase".into(), json!(detail.phrase));
        error.insert("protocol".into(), json!(detail.protocol));
        error.insert("protocolCode".into(), json!(detail.protocol_code));
    }
    sections.insert("Error", error);

    render(&sections)
}

fn render(sections: &BTreeMap<&str, Map<String, Value>>) -> String {
    let mut out = String::new();
    for (title, entries) in sections {
        if entries.is_empty() {
            continue;
        }
        out.push_str(title);
        out.push('\n');
        // serde_json's Map preserves insertion order; sort for stability.
        let mut keys: Vec<&String> = entries.keys().collect();
        keys.sort();
        for key in keys {
            let value = &entries[key.as_str()];
            let rendered = match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            };
            out.push_str(&format!("  {key}: {rendered}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::CallDirection;
    use crate::engine::mock::MockCall;
    use crate::engine::{EngineAudioStats, EngineCallStatus, EngineErrorInfo};

    #[test]
    fn report_contains_sorted_sections() {
        let handle = MockCall::inbound("sip:200@example.com");
        handle.set_audio_stats(EngineAudioStats {
            codec_mime_type: Some("OPUS".to_string()),
            ..Default::default()
        });
        handle.record_log(CallDirection::Inbound, EngineCallStatus::Success);
        let call = Call::from_engine(handle).unwrap();

        let report = call_info_report(&call);
        assert!(report.contains("Audio\n"));
        assert!(report.contains("codec: OPUS"));
        assert!(report.contains("To Address\n"));
        assert!(report.contains("username: 200"));
        assert!(report.contains("direction: Inbound"));

        let audio_pos = report.find("Audio").unwrap();
        let call_pos = report.find("Call\n").unwrap();
        assert!(audio_pos < call_pos);
    }

    #[test]
    fn error_section_is_omitted_without_error_detail() {
        let call = Call::from_engine(MockCall::outbound("sip:100@example.com")).unwrap();
        assert!(!call_info_report(&call).contains("Error\n"));
    }

    #[test]
    fn error_section_renders_protocol_detail() {
        let handle = MockCall::outbound("sip:100@example.com");
        handle.set_error_info(EngineErrorInfo {
            reason: "Busy Here".to_string(),
            phrase: "Busy Here".to_string(),
            protocol: "SIP".to_string(),
            protocol_code: 486,
        });
        let call = Call::from_engine(handle).unwrap();

        let report = call_info_report(&call);
        assert!(report.contains("Error\n"));
        assert!(report.contains("protocolCode: 486"));
    }
}
