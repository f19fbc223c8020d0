// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

#![deny(warnings)]

mod action;
mod aws_provider;
mod client;
mod error;
mod metadata;
mod provider;

pub use action::{Action, Binding};
pub use aws_provider::AwsProvider;
pub use client::CloudClient;
pub use error::CloudError;
pub use metadata::{fetch_instance_identity, InstanceIdentity};
pub use provider::{EniInfo, Provider, RouteInfo, RouteMutationError};
