// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cloud::{Action, Binding, CloudClient};
use dispatch::{Dispatcher, Reconciler, StateStore};
use telemetry::{Session, VrrpServicer};
use tokio::sync::watch;

use crate::config::{ActionConfig, Config};
use crate::error::InitError;

fn action_from_config(action: &ActionConfig) -> Action {
    match action {
        ActionConfig::AwsActivateVip { device_index, vip } => Action::AssignVip {
            device_index: *device_index as i32,
            vip: *vip,
        },
        ActionConfig::AwsUpdateRouteTable {
            route_table_id,
            destination,
            target_network_interface,
        } => Action::UpdateRouteTable {
            route_table_id: route_table_id.clone(),
            destination: *destination,
            target_eni: target_network_interface.clone(),
        },
    }
}

/// Build the session -> binding map from config, validating every referenced cloud resource
/// up-front. Mirrors `get_actions_from_config` in the original.
async fn build_bindings(
    config: &Config,
    client: Arc<CloudClient>,
) -> Result<HashMap<Session, Binding>, InitError> {
    let mut bindings = HashMap::with_capacity(config.groups.len());
    for group in &config.groups {
        let session = Session {
            interface: group.xr_interface.clone(),
            vrid: group.vrid,
        };
        let binding = Binding {
            action: action_from_config(&group.action),
            client: client.clone(),
        };
        binding
            .action
            .validate(&client)
            .await
            .map_err(InitError::Cloud)?;
        bindings.insert(session, binding);
    }
    Ok(bindings)
}

/// Run the agent to completion: load config, validate cloud resources, start the telemetry
/// server and reconciliation loop, and block until `shutdown` fires or the telemetry server
/// exits on its own. Mirrors `initialise()` plus the remainder of `main()` in the original.
pub async fn run(config: Config, shutdown: watch::Receiver<()>) -> Result<(), InitError> {
    let endpoint_url = config
        .global
        .aws
        .as_ref()
        .and_then(|aws| aws.ec2_private_endpoint_url.as_deref());
    let client = Arc::new(CloudClient::new(endpoint_url).await?);
    log::info!("Initialised cloud client for instance {}", client.instance_id());

    let bindings = Arc::new(build_bindings(&config, client).await?);
    let store = Arc::new(StateStore::new(bindings.keys().cloned()));

    let dispatcher = Arc::new(Dispatcher::new(bindings.clone(), store.clone()));
    let dispatcher_for_events = dispatcher.clone();
    let msg_handler = Arc::new(move |event| dispatcher_for_events.on_event(event));
    let store_for_disconnect = store.clone();
    let disconnect_handler = Arc::new(move || {
        log::warn!("Telemetry stream disconnected, resetting all sessions to inactive");
        store_for_disconnect.reset_all_to_inactive();
    });
    let servicer = VrrpServicer::new(msg_handler, disconnect_handler);

    let addr: SocketAddr = ([0, 0, 0, 0], config.global.port).into();
    let reconciler = Reconciler::new(
        bindings,
        store,
        Duration::from_secs(config.global.consistency_check_interval_seconds as u64),
    );
    let reconciler_handle = tokio::spawn(reconciler.run(shutdown.clone()));

    let telemetry_result = telemetry::serve(addr, servicer, shutdown).await;

    // The telemetry server has already drained; the reconciler is either winding down on the
    // same shutdown signal or, if `serve` returned for some other reason, no longer useful.
    reconciler_handle.abort();

    telemetry_result.map_err(|err| InitError::Telemetry(err.to_string()))
}
