// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use protos::telemetry::TelemetryField;

/// Find a field by name in a GPB key/value iterable.
///
/// ```text
/// fields = [
///     TelemetryField { name: "interface-name", string_value: "Hun0/0/0/1", .. },
///     TelemetryField { name: "virtual-router-id", uint32_value: 1, .. },
/// ]
/// gpbkv_get_field(&fields, "interface-name") -> Some(&fields[0])
/// ```
pub fn gpbkv_get_field<'a>(
    fields: &'a [TelemetryField],
    name: &str,
) -> Option<&'a TelemetryField> {
    fields.iter().find(|f| f.name == name)
}
