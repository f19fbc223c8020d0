// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_ec2::config::retry::{RetryConfig, RetryMode};
use aws_sdk_ec2::config::timeout::TimeoutConfig;
use aws_sdk_ec2::error::ProvideErrorMetadata;
use aws_sdk_ec2::types::Route;
use ipnetwork::Ipv4Network;

use crate::error::CloudError;
use crate::provider::{EniInfo, Provider, RouteInfo, RouteMutationError};

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(1);

/// Live `Provider` backed by the real EC2 API, matching `AWSClient`'s connection settings:
/// short connect/read timeouts and a conservative retry policy, both overridable through the
/// SDK's standard `AWS_MAX_ATTEMPTS`/`AWS_RETRY_MODE` environment variables.
pub struct AwsProvider {
    client: aws_sdk_ec2::Client,
}

impl AwsProvider {
    pub async fn new(region: String, endpoint_url: Option<&str>) -> Self {
        let retry_config = std::env::var("AWS_RETRY_MODE")
            .ok()
            .and_then(|mode| match mode.as_str() {
                "adaptive" => Some(RetryMode::Adaptive),
                "standard" => Some(RetryMode::Standard),
                _ => None,
            })
            .map(RetryConfig::new)
            .unwrap_or_else(|| RetryConfig::standard())
            .with_max_attempts(
                std::env::var("AWS_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1),
            );

        let timeout_config = TimeoutConfig::builder()
            .connect_timeout(CONNECTION_TIMEOUT)
            .read_timeout(CONNECTION_TIMEOUT)
            .build();

        let mut loader = aws_config::from_env()
            .region(aws_sdk_ec2::config::Region::new(region))
            .retry_config(retry_config)
            .timeout_config(timeout_config);
        if let Some(endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        AwsProvider {
            client: aws_sdk_ec2::Client::new(&sdk_config),
        }
    }

    fn route_mutation_error(err: impl ProvideErrorMetadata) -> RouteMutationError {
        match err.code() {
            Some("InvalidParameterValue") | Some("InvalidRoute.NotFound") => {
                RouteMutationError::RouteNotFound
            }
            Some("RouteAlreadyExists") => RouteMutationError::RouteAlreadyExists,
            _ => RouteMutationError::Other(CloudError::Provider(format!(
                "{}: {}",
                err.code().unwrap_or("unknown"),
                err.message().unwrap_or("")
            ))),
        }
    }
}

#[async_trait]
impl Provider for AwsProvider {
    async fn describe_instance_enis(
        &self,
        instance_id: &str,
    ) -> Result<HashMap<i32, String>, CloudError> {
        let resp = self
            .client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(|err| CloudError::Provider(format!("{err}")))?;

        let instance = resp
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .next()
            .ok_or_else(|| CloudError::Provider(format!("instance {instance_id} not found")))?;

        Ok(instance
            .network_interfaces()
            .iter()
            .filter_map(|eni| {
                let attachment = eni.attachment()?;
                Some((attachment.device_index()?, eni.network_interface_id()?.to_owned()))
            })
            .collect())
    }

    async fn describe_eni(&self, eni_id: &str) -> Result<EniInfo, CloudError> {
        let resp = self
            .client
            .describe_network_interfaces()
            .network_interface_ids(eni_id)
            .send()
            .await
            .map_err(|err| match err.as_service_error().and_then(|e| e.code()) {
                Some("InvalidNetworkInterfaceID.NotFound") => {
                    CloudError::UnknownENI(eni_id.to_owned())
                }
                _ => CloudError::Provider(format!("{err}")),
            })?;

        let eni = resp
            .network_interfaces()
            .first()
            .ok_or_else(|| CloudError::UnknownENI(eni_id.to_owned()))?;

        let private_ips = eni
            .private_ip_addresses()
            .iter()
            .filter_map(|addr| addr.private_ip_address()?.parse().ok())
            .collect();

        Ok(EniInfo {
            eni_id: eni_id.to_owned(),
            private_ips,
        })
    }

    async fn assign_private_ip(&self, eni_id: &str, ip: Ipv4Addr) -> Result<(), CloudError> {
        self.client
            .assign_private_ip_addresses()
            .network_interface_id(eni_id)
            .private_ip_addresses(ip.to_string())
            .allow_reassignment(true)
            .send()
            .await
            .map_err(|err| CloudError::Provider(format!("{err}")))?;
        Ok(())
    }

    async fn describe_route_table(&self, route_table_id: &str) -> Result<Vec<RouteInfo>, CloudError> {
        let resp = self
            .client
            .describe_route_tables()
            .route_table_ids(route_table_id)
            .send()
            .await
            .map_err(|err| match err.as_service_error().and_then(|e| e.code()) {
                Some("InvalidRouteTableID.NotFound") => {
                    CloudError::UnknownRouteTable(route_table_id.to_owned())
                }
                _ => CloudError::Provider(format!("{err}")),
            })?;

        let rtb = resp
            .route_tables()
            .first()
            .ok_or_else(|| CloudError::UnknownRouteTable(route_table_id.to_owned()))?;

        Ok(rtb.routes().iter().filter_map(route_info).collect())
    }

    async fn replace_route(
        &self,
        route_table_id: &str,
        destination: Ipv4Network,
        target_eni: &str,
    ) -> Result<(), RouteMutationError> {
        self.client
            .replace_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination.to_string())
            .network_interface_id(target_eni)
            .send()
            .await
            .map_err(Self::route_mutation_error)?;
        Ok(())
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination: Ipv4Network,
        target_eni: &str,
    ) -> Result<(), RouteMutationError> {
        self.client
            .create_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination.to_string())
            .network_interface_id(target_eni)
            .send()
            .await
            .map_err(Self::route_mutation_error)?;
        Ok(())
    }
}

fn route_info(route: &Route) -> Option<RouteInfo> {
    Some(RouteInfo {
        destination: route.destination_cidr_block()?.parse().ok()?,
        target_eni: route.network_interface_id().map(str::to_owned),
    })
}
