// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::VecDeque;

use prost::Message;
use protos::telemetry::Telemetry;

use crate::error::WireError;
use crate::gpbkv::gpbkv_get_field;
use crate::types::{Session, VrrpEvent, VrrpState};

const VRRP_ENCODING_PATH: &str =
    "Cisco-IOS-XR-ipv4-vrrp-oper:vrrp/ipv4/virtual-routers/virtual-router";

/// Cap on the number of distinct unexpected encoding paths remembered, bounding memory against
/// an adversarial or misconfigured peer that sends many distinct paths.
pub const MAX_REMEMBERED_UNEXPECTED_PATHS: usize = 10;

/// Decode a dialout frame's opaque `data` payload.
///
/// Returns `Ok(Some(msg))` for a successfully-parsed self-describing-gpb message, `Ok(None)`
/// for a JSON payload (unsupported, to be dropped by the caller with a warning already logged
/// here), or `Err` if the payload is neither - which terminates the stream.
pub fn decode_frame(data: &[u8]) -> Result<Option<Telemetry>, WireError> {
    match Telemetry::decode(data) {
        Ok(msg) => Ok(Some(msg)),
        Err(decode_err) => {
            if serde_json::from_slice::<serde_json::Value>(data).is_ok() {
                log::warn!(
                    "Ignoring message with JSON payload, only self-describing-gpb encoding is supported"
                );
                Ok(None)
            } else {
                Err(WireError::Decode(decode_err.to_string()))
            }
        }
    }
}

/// Route a successfully-decoded telemetry message by its encoding path, extracting VRRP events
/// on the known path and warning (at most once per distinct unexpected path) otherwise.
pub fn handle_telemetry_message(
    msg: &Telemetry,
    unexpected_paths: &mut VecDeque<String>,
) -> Vec<VrrpEvent> {
    if msg.encoding_path == VRRP_ENCODING_PATH {
        if msg.data_gpbkv.is_empty() {
            log::warn!(
                "Ignoring telemetry message on path {:?} without gpbkv data, only \
                 self-describing-gpb encoding is supported",
                msg.encoding_path
            );
            return Vec::new();
        }
        return handle_vrrp_message(msg);
    }

    if !unexpected_paths.contains(&msg.encoding_path) {
        log::warn!(
            "Received unexpected telemetry message with path {:?} \
             (subsequent messages will be silently dropped)",
            msg.encoding_path
        );
        if unexpected_paths.len() == MAX_REMEMBERED_UNEXPECTED_PATHS {
            unexpected_paths.pop_front();
        }
        unexpected_paths.push_back(msg.encoding_path.clone());
    }
    Vec::new()
}

fn handle_vrrp_message(msg: &Telemetry) -> Vec<VrrpEvent> {
    let mut events = Vec::with_capacity(msg.data_gpbkv.len());
    for session_entry in &msg.data_gpbkv {
        match extract_vrrp_event(session_entry) {
            Some(event) => events.push(event),
            None => log::error!("VRRP session data has unexpected structure"),
        }
    }
    events
}

fn extract_vrrp_event(entry: &protos::telemetry::TelemetryField) -> Option<VrrpEvent> {
    use protos::telemetry::telemetry_field::ValueByType;

    let keys = &gpbkv_get_field(&entry.fields, "keys")?.fields;
    let content = &gpbkv_get_field(&entry.fields, "content")?.fields;

    let interface = match &gpbkv_get_field(keys, "interface-name")?.value_by_type {
        Some(ValueByType::StringValue(s)) => s.clone(),
        _ => return None,
    };
    let vrid = match &gpbkv_get_field(keys, "virtual-router-id")?.value_by_type {
        Some(ValueByType::Uint32Value(v)) => u8::try_from(*v).ok()?,
        _ => return None,
    };
    let vrrp_state = match &gpbkv_get_field(content, "vrrp-state")?.value_by_type {
        Some(ValueByType::StringValue(s)) => s.clone(),
        _ => return None,
    };

    Some(VrrpEvent {
        session: Session {
            interface,
            vrid,
        },
        state: VrrpState::from_wire(&vrrp_state),
    })
}

#[cfg(test)]
mod tests {
    use protos::telemetry::telemetry_field::ValueByType;
    use protos::telemetry::TelemetryField;

    use super::*;

    fn vrrp_frame(interface: &str, vrid: u32, state: &str) -> Telemetry {
        Telemetry {
            encoding_path: VRRP_ENCODING_PATH.to_owned(),
            data_gpbkv: vec![TelemetryField {
                fields: vec![
                    TelemetryField {
                        name: "keys".to_owned(),
                        fields: vec![
                            TelemetryField {
                                name: "interface-name".to_owned(),
                                value_by_type: Some(ValueByType::StringValue(
                                    interface.to_owned(),
                                )),
                                ..Default::default()
                            },
                            TelemetryField {
                                name: "virtual-router-id".to_owned(),
                                value_by_type: Some(ValueByType::Uint32Value(vrid)),
                                ..Default::default()
                            },
                        ],
                        ..Default::default()
                    },
                    TelemetryField {
                        name: "content".to_owned(),
                        fields: vec![TelemetryField {
                            name: "vrrp-state".to_owned(),
                            value_by_type: Some(ValueByType::StringValue(state.to_owned())),
                            ..Default::default()
                        }],
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn extracts_active_state_from_state_master() {
        let msg = vrrp_frame("HundredGigE0/0/0/1", 7, "state-master");
        let mut unexpected = VecDeque::new();
        let events = handle_telemetry_message(&msg, &mut unexpected);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].session.interface, "HundredGigE0/0/0/1");
        assert_eq!(events[0].session.vrid, 7);
        assert_eq!(events[0].state, VrrpState::Active);
    }

    #[test]
    fn maps_any_non_master_state_to_inactive() {
        let msg = vrrp_frame("Hun0/0/0/2", 1, "state-backup");
        let mut unexpected = VecDeque::new();
        let events = handle_telemetry_message(&msg, &mut unexpected);
        assert_eq!(events[0].state, VrrpState::Inactive);
    }

    #[test]
    fn malformed_entry_is_skipped_not_fatal() {
        let mut msg = vrrp_frame("Hun0/0/0/2", 1, "state-master");
        // Drop the "content" sub-field so extraction fails for this entry only.
        msg.data_gpbkv[0].fields.truncate(1);
        let mut unexpected = VecDeque::new();
        let events = handle_telemetry_message(&msg, &mut unexpected);
        assert!(events.is_empty());
    }

    #[test]
    fn empty_gpbkv_on_vrrp_path_is_dropped() {
        let msg = Telemetry {
            encoding_path: VRRP_ENCODING_PATH.to_owned(),
            ..Default::default()
        };
        let mut unexpected = VecDeque::new();
        assert!(handle_telemetry_message(&msg, &mut unexpected).is_empty());
    }

    #[test]
    fn unexpected_path_is_remembered_with_fifo_eviction() {
        let mut unexpected = VecDeque::new();
        for i in 0..MAX_REMEMBERED_UNEXPECTED_PATHS + 1 {
            let msg = Telemetry {
                encoding_path: format!("unexpected/path/{i}"),
                ..Default::default()
            };
            handle_telemetry_message(&msg, &mut unexpected);
        }
        assert_eq!(unexpected.len(), MAX_REMEMBERED_UNEXPECTED_PATHS);
        assert!(!unexpected.contains(&"unexpected/path/0".to_owned()));
        assert!(unexpected.contains(&format!(
            "unexpected/path/{MAX_REMEMBERED_UNEXPECTED_PATHS}"
        )));
    }

    #[test]
    fn decode_frame_rejects_non_protobuf_non_json_payload() {
        let err = decode_frame(b"\xff\xfe not valid protobuf or json").unwrap_err();
        assert!(matches!(err, WireError::Decode(_)));
    }

    #[test]
    fn decode_frame_drops_json_payload() {
        let result = decode_frame(br#"{"hello": "world"}"#).unwrap();
        assert!(result.is_none());
    }
}
