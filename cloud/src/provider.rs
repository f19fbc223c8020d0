// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::HashMap;
use std::net::Ipv4Addr;

use async_trait::async_trait;
use ipnetwork::Ipv4Network;

use crate::error::CloudError;

/// A network interface's attachment device index and currently-assigned private IPs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EniInfo {
    pub eni_id: String,
    pub private_ips: Vec<Ipv4Addr>,
}

/// A single route table entry relevant to `update_route_table`'s precheck.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteInfo {
    pub destination: Ipv4Network,
    pub target_eni: Option<String>,
}

/// Outcome of a route-table mutation, distinguishing the two provider error codes that
/// `update_route_table`'s retry ladder (see [`crate::action`]) must branch on from every other
/// provider error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteMutationError {
    /// `InvalidParameterValue` or `InvalidRoute.NotFound`: the destination is not yet present.
    RouteNotFound,
    /// `RouteAlreadyExists`: a concurrent worker created the route first.
    RouteAlreadyExists,
    Other(CloudError),
}

impl From<CloudError> for RouteMutationError {
    fn from(err: CloudError) -> Self {
        RouteMutationError::Other(err)
    }
}

/// Thin capability surface over the handful of EC2 operations the agent needs. Kept as a trait
/// so `assign_vip`/`update_route_table`'s idempotent retry logic can be exercised against a fake
/// in unit tests, the same way `storage`'s driver logic is tested against in-memory backends
/// rather than a live Redis.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Device index -> ENI ID for every network interface attached to `instance_id`.
    async fn describe_instance_enis(
        &self,
        instance_id: &str,
    ) -> Result<HashMap<i32, String>, CloudError>;

    async fn describe_eni(&self, eni_id: &str) -> Result<EniInfo, CloudError>;

    async fn assign_private_ip(&self, eni_id: &str, ip: Ipv4Addr) -> Result<(), CloudError>;

    async fn describe_route_table(&self, route_table_id: &str) -> Result<Vec<RouteInfo>, CloudError>;

    async fn replace_route(
        &self,
        route_table_id: &str,
        destination: Ipv4Network,
        target_eni: &str,
    ) -> Result<(), RouteMutationError>;

    async fn create_route(
        &self,
        route_table_id: &str,
        destination: Ipv4Network,
        target_eni: &str,
    ) -> Result<(), RouteMutationError>;
}
