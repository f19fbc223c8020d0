// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use bytes::BytesMut;
use prost::Message;

use crate::telemetry::{telemetry_field::ValueByType, Telemetry, TelemetryField};

#[test]
fn test_telemetry_protos() {
    let msg = Telemetry {
        encoding_path: "Cisco-IOS-XR-ipv4-vrrp-oper:vrrp/ipv4/virtual-routers/virtual-router"
            .to_owned(),
        data_gpbkv: vec![TelemetryField {
            name: "keys".to_owned(),
            fields: vec![TelemetryField {
                name: "interface-name".to_owned(),
                value_by_type: Some(ValueByType::StringValue("HundredGigE0/0/0/1".to_owned())),
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    };

    let mut buf = BytesMut::with_capacity(msg.encoded_len());
    msg.encode(&mut buf).unwrap();

    let decoded = Telemetry::decode(&mut buf).expect("decoded telemetry message");
    assert_eq!(msg, decoded);
}
