// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::watch;
use tonic::transport::Server;

use protos::cisco_grpc_dialout::mdt_dialout_server::MdtDialoutServer;

use crate::service::VrrpServicer;

/// 1 second keepalive interval/timeout, so peer loss (a crashed or unreachable router) is
/// detected within a few seconds rather than waiting on a TCP-level timeout.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(1);

/// Serve the VRRP dialout endpoint on `addr`, insecure, until `shutdown` is notified.
///
/// The router connects once and holds the stream open indefinitely; there is no reply data,
/// only an always-empty trailing stream once the RPC completes.
pub async fn serve(
    addr: SocketAddr,
    servicer: VrrpServicer,
    mut shutdown: watch::Receiver<()>,
) -> Result<(), tonic::transport::Error> {
    log::info!("Listening for VRRP telemetry dialout on {addr}...");
    Server::builder()
        .http2_keepalive_interval(Some(KEEPALIVE_INTERVAL))
        .http2_keepalive_timeout(Some(KEEPALIVE_INTERVAL))
        .concurrency_limit_per_connection(1)
        .add_service(MdtDialoutServer::new(servicer))
        .serve_with_shutdown(addr, async move {
            let _ = shutdown.changed().await;
        })
        .await
}
