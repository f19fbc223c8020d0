// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::fmt;

use cloud::CloudError;

/// Config-file parsing and validation errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    Read(String),
    Parse(String),
    DuplicateGroup { xr_interface: String, vrid: u8 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read(msg) => write!(f, "failed to read config file: {msg}"),
            ConfigError::Parse(msg) => write!(f, "failed to parse config file: {msg}"),
            ConfigError::DuplicateGroup { xr_interface, vrid } => write!(
                f,
                "only one action allowed per VRRP group, got multiple for <xr_interface={xr_interface},vrid={vrid}>"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Fatal start-up failure, covering every step of the supervisor's `initialise()` sequence.
/// Any variant results in the process exiting with status 2, matching the original's
/// `except InitError` handler.
#[derive(Debug)]
pub enum InitError {
    Config(ConfigError),
    Cloud(CloudError),
    Telemetry(String),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::Config(err) => write!(f, "configuration error: {err}"),
            InitError::Cloud(err) => write!(f, "cloud initialisation error: {err}"),
            InitError::Telemetry(msg) => write!(f, "telemetry server initialisation error: {msg}"),
        }
    }
}

impl std::error::Error for InitError {}

impl From<ConfigError> for InitError {
    fn from(err: ConfigError) -> Self {
        InitError::Config(err)
    }
}

impl From<CloudError> for InitError {
    fn from(err: CloudError) -> Self {
        InitError::Cloud(err)
    }
}
