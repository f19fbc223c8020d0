// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use ipnetwork::Ipv4Network;

use crate::aws_provider::AwsProvider;
use crate::error::CloudError;
use crate::metadata;
use crate::provider::{EniInfo, Provider, RouteInfo, RouteMutationError};

/// Thin capability layer over the cloud API: lookup ENIs/route tables, assign a private IP,
/// replace/create a route, with idempotent preconditions. Construction fetches the local
/// instance's identity from the metadata service and caches its attached ENIs by device index,
/// mirroring `AWSClient.__init__`.
pub struct CloudClient {
    provider: Arc<dyn Provider>,
    instance_id: String,
    enis_by_device_index: HashMap<i32, String>,
}

impl CloudClient {
    pub async fn new(endpoint_url: Option<&str>) -> Result<Self, CloudError> {
        let identity = metadata::fetch_instance_identity().await?;
        let provider = AwsProvider::new(identity.region, endpoint_url).await;
        Self::with_provider(Arc::new(provider), identity.instance_id).await
    }

    /// Construct against an arbitrary `Provider`, used in production for the real AWS-backed
    /// provider and in tests for a fake one.
    pub async fn with_provider(
        provider: Arc<dyn Provider>,
        instance_id: String,
    ) -> Result<Self, CloudError> {
        let enis_by_device_index = provider.describe_instance_enis(&instance_id).await?;
        Ok(CloudClient {
            provider,
            instance_id,
            enis_by_device_index,
        })
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Look up a local ENI by its attachment device index. Used at start-up to validate that
    /// every configured `AssignVIP` binding refers to an attached interface.
    pub fn lookup_local_eni_by_index(&self, device_index: i32) -> Result<&str, CloudError> {
        self.enis_by_device_index
            .get(&device_index)
            .map(String::as_str)
            .ok_or(CloudError::UnknownDeviceIndex(device_index))
    }

    pub async fn lookup_eni(&self, eni_id: &str) -> Result<EniInfo, CloudError> {
        self.provider.describe_eni(eni_id).await
    }

    pub async fn lookup_route_table(&self, route_table_id: &str) -> Result<Vec<RouteInfo>, CloudError> {
        self.provider.describe_route_table(route_table_id).await
    }

    /// Assign `ip` as a private IP address on the ENI attached at `device_index`.
    ///
    /// `AllowReassignment` is always set: the VIP may currently be bound to a peer instance's
    /// ENI and must be silently stolen.
    pub async fn assign_vip(
        &self,
        device_index: i32,
        ip: Ipv4Addr,
        precheck: bool,
    ) -> Result<(), CloudError> {
        let eni_id = self.lookup_local_eni_by_index(device_index)?.to_owned();

        if precheck {
            let eni = self.provider.describe_eni(&eni_id).await?;
            if eni.private_ips.contains(&ip) {
                log::debug!("IPv4 address {ip} already assigned");
                return Ok(());
            }
            log::debug!("IPv4 address {ip} not assigned at precheck");
        }

        log::info!("Assigning private IPv4 address {ip} to device index {device_index} ({eni_id})");
        self.provider.assign_private_ip(&eni_id, ip).await
    }

    /// Update `route_table_id` so that `destination` routes via `target_eni`.
    ///
    /// `replace_route` is not a safe upsert (fails when the route does not exist yet) and
    /// `create_route` is not safe either (fails when it already does). This sequence, plus a
    /// single `replace_route` retry on `RouteAlreadyExists`, is the minimum idempotent-looking
    /// upsert across both operations.
    pub async fn update_route_table(
        &self,
        route_table_id: &str,
        destination: Ipv4Network,
        target_eni: &str,
        precheck: bool,
    ) -> Result<(), CloudError> {
        if precheck {
            let routes = self.provider.describe_route_table(route_table_id).await?;
            let already_present = routes.iter().any(|route| {
                route.destination == destination
                    && route.target_eni.as_deref() == Some(target_eni)
            });
            if already_present {
                log::debug!(
                    "Route destination {destination} via {target_eni} already present in route table {route_table_id}"
                );
                return Ok(());
            }
            log::debug!(
                "Route destination {destination} via {target_eni} not present in route table {route_table_id} at precheck"
            );
        }

        log::info!(
            "Updating route table {route_table_id} with destination {destination}, target {target_eni}"
        );
        match self
            .provider
            .replace_route(route_table_id, destination, target_eni)
            .await
        {
            Ok(()) => Ok(()),
            Err(RouteMutationError::RouteNotFound) => {
                log::info!(
                    "Creating route in route table {route_table_id} with destination {destination}, target {target_eni}"
                );
                match self
                    .provider
                    .create_route(route_table_id, destination, target_eni)
                    .await
                {
                    Ok(()) => Ok(()),
                    Err(RouteMutationError::RouteAlreadyExists) => {
                        // Another worker created the route concurrently; this is not an error,
                        // just retry the replace once more.
                        log::info!(
                            "Route already created in route table {route_table_id} with destination \
                             {destination}, trying again to update with target {target_eni}"
                        );
                        self.provider
                            .replace_route(route_table_id, destination, target_eni)
                            .await
                            .map_err(route_mutation_to_cloud_error)
                    }
                    Err(other) => Err(route_mutation_to_cloud_error(other)),
                }
            }
            Err(other) => Err(route_mutation_to_cloud_error(other)),
        }
    }
}

fn route_mutation_to_cloud_error(err: RouteMutationError) -> CloudError {
    match err {
        RouteMutationError::Other(err) => err,
        RouteMutationError::RouteNotFound => {
            CloudError::Provider("route not found on retry".to_owned())
        }
        RouteMutationError::RouteAlreadyExists => {
            CloudError::Provider("route already exists on retry".to_owned())
        }
    }
}
