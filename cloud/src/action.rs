// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::net::Ipv4Addr;
use std::sync::Arc;

use ipnetwork::Ipv4Network;

use crate::client::CloudClient;
use crate::error::CloudError;

/// An action binding, fixed for the lifetime of the agent once constructed from configuration.
#[derive(Clone, Debug)]
pub enum Action {
    AssignVip { device_index: i32, vip: Ipv4Addr },
    UpdateRouteTable {
        route_table_id: String,
        destination: Ipv4Network,
        target_eni: String,
    },
}

impl Action {
    /// Apply this action against `client`. In precheck mode the underlying provider call is a
    /// no-op if cloud state already matches; otherwise it performs the mutation unconditionally.
    pub async fn apply(&self, client: &CloudClient, precheck: bool) -> Result<(), CloudError> {
        match self {
            Action::AssignVip { device_index, vip } => {
                client.assign_vip(*device_index, *vip, precheck).await
            }
            Action::UpdateRouteTable {
                route_table_id,
                destination,
                target_eni,
            } => {
                client
                    .update_route_table(route_table_id, *destination, target_eni, precheck)
                    .await
            }
        }
    }

    /// Validate that this action's referenced cloud resources exist, per the construction
    /// sequence's start-up validation step. Aborts configuration loading with a fatal error on
    /// any lookup failure.
    pub async fn validate(&self, client: &CloudClient) -> Result<(), CloudError> {
        match self {
            Action::AssignVip { device_index, .. } => {
                client.lookup_local_eni_by_index(*device_index)?;
                Ok(())
            }
            Action::UpdateRouteTable {
                route_table_id,
                target_eni,
                ..
            } => {
                client.lookup_route_table(route_table_id).await?;
                client.lookup_eni(target_eni).await?;
                Ok(())
            }
        }
    }
}

/// Shared ownership of an action binding plus the client it is applied through, as stored in
/// the dispatcher's fixed `session -> binding` map.
#[derive(Clone)]
pub struct Binding {
    pub action: Action,
    pub client: Arc<CloudClient>,
}

impl Binding {
    pub async fn apply(&self, precheck: bool) -> Result<(), CloudError> {
        self.action.apply(&self.client, precheck).await
    }
}
