// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::net::SocketAddr;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::runtime::Builder;
use warp::Filter;

/// Bind address for the `/healthz` and `/metricsz` endpoints.
#[derive(Clone, Debug)]
pub struct InfraConfig {
    pub bind_addr: SocketAddr,
}

impl Default for InfraConfig {
    fn default() -> Self {
        InfraConfig {
            bind_addr: "0.0.0.0:9090".parse().unwrap(),
        }
    }
}

fn setup_metrics_handler() -> Result<PrometheusHandle, String> {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::set_boxed_recorder(Box::new(recorder))
        .map_err(|err| format!("Failed to install Prometheus metrics recorder: {err}"))?;
    Ok(handle)
}

/// Spawn the `/healthz` and `/metricsz` endpoints on a dedicated thread, isolated from the
/// agent's main event loop so a slow metrics scrape can never hold up telemetry handling.
///
/// Unlike the teacher's `grpc_util::infra`, there is no independent shutdown signal here: the
/// admin thread lives for the process lifetime and is torn down when the process exits, since
/// this agent's shutdown sequencing (§4.F) is driven entirely by the supervisor.
pub fn setup_infra_endpoints(config: InfraConfig) -> Result<(), String> {
    let metrics_handle = setup_metrics_handler()?;
    let bind_addr = config.bind_addr;

    std::thread::spawn(move || {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .thread_name("admin")
            .build()
            .expect("initialize admin event loop");

        runtime.block_on(async move {
            let healthz = warp::path("healthz").and(warp::get()).map(|| "OK");
            let metricsz = warp::path("metricsz")
                .and(warp::get())
                .map(move || metrics_handle.render());

            warp::serve(healthz.or(metricsz)).bind(bind_addr).await;
        });
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::time::{sleep, Duration};

    use super::{setup_infra_endpoints, InfraConfig};

    #[tokio::test]
    async fn infra_endpoints_respond() {
        let config = InfraConfig {
            bind_addr: "127.0.0.1:19091".parse().unwrap(),
        };
        setup_infra_endpoints(config).unwrap();

        // `warp` does not give us a way to wait until it has finished binding.
        sleep(Duration::from_millis(500)).await;

        let response = reqwest::get("http://127.0.0.1:19091/healthz")
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "OK");

        metrics::increment_counter!("test_counter");
        let response = reqwest::get("http://127.0.0.1:19091/metricsz")
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(response.text().await.unwrap().contains("test_counter"));
    }
}
