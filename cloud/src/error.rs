// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::fmt;

/// Errors raised by the cloud client, covering both construction-time and per-action failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloudError {
    /// The link-local instance-metadata service could not be reached. Most commonly caused by
    /// an IMDSv2 hop limit of 1 on a pod network.
    MetadataUnavailable(String),
    UnknownDeviceIndex(i32),
    UnknownENI(String),
    UnknownRouteTable(String),
    /// Any other provider-side error, carrying the provider's error code and message.
    Provider(String),
}

impl std::error::Error for CloudError {}

impl fmt::Display for CloudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudError::MetadataUnavailable(msg) => {
                write!(f, "unable to reach instance metadata service: {msg}")
            }
            CloudError::UnknownDeviceIndex(idx) => {
                write!(f, "no network interface attached at device index {idx}")
            }
            CloudError::UnknownENI(id) => write!(f, "network interface {id} not found"),
            CloudError::UnknownRouteTable(id) => write!(f, "route table {id} not found"),
            CloudError::Provider(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<String> for CloudError {
    fn from(msg: String) -> Self {
        CloudError::Provider(msg)
    }
}
