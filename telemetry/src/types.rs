// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::fmt;

/// The unique key into the action and state maps: two events referring to the same
/// `(interface, vrid)` pair concern the same session regardless of any other field.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Session {
    pub interface: String,
    pub vrid: u8,
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.interface, self.vrid)
    }
}

/// A two-valued tag. The wire carries a richer set of strings (`state-master`,
/// `state-backup`, `state-init`, ...); only `state-master` maps to `Active`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VrrpState {
    Inactive,
    Active,
}

impl VrrpState {
    pub fn from_wire(value: &str) -> Self {
        if value == "state-master" {
            VrrpState::Active
        } else {
            VrrpState::Inactive
        }
    }
}

/// Produced once per received telemetry frame, consumed by the dispatcher, then discarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VrrpEvent {
    pub session: Session,
    pub state: VrrpState,
}
