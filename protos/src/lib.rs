// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

#![deny(warnings)]
#![allow(clippy::derive_partial_eq_without_eq)]

pub mod cisco_grpc_dialout {
    include!(concat!(env!("OUT_DIR"), "/cisco_grpc_dialout.rs"));
}

pub mod telemetry {
    include!(concat!(env!("OUT_DIR"), "/telemetry.rs"));
}

#[cfg(test)]
mod tests;
