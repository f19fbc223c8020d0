// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::fmt;

/// Errors that terminate the dialout stream. A malformed VRRP *entry* is logged and skipped
/// (see [`crate::decode::handle_vrrp_message`]) rather than represented here - only a frame
/// that can't be decoded as either self-describing-gpb or JSON reaches this type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireError {
    Decode(String),
}

impl std::error::Error for WireError {}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Decode(msg) => write!(f, "failed to decode telemetry frame: {msg}"),
        }
    }
}

impl From<WireError> for tonic::Status {
    fn from(err: WireError) -> Self {
        tonic::Status::invalid_argument(err.to_string())
    }
}
