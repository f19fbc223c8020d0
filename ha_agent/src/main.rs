// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use agent_util::infra::InfraConfig;
use clap::Parser;
use tokio::sync::watch;

mod config;
mod error;
mod supervisor;

use config::Config;
use error::InitError;

/// VRRP-triggered high-availability sidecar for XRd.
#[derive(Parser, Debug)]
#[command(name = "ha_agent", version)]
struct Cli {
    /// Path to the agent's YAML config file.
    #[arg(short, long, default_value = "/etc/ha_app/config.yaml")]
    config: PathBuf,
}

fn init_or_exit(cli: &Cli) -> Result<Config, InitError> {
    Config::from_file(&cli.config).map_err(InitError::from)
}

/// Runs the agent, returning whether a SIGINT was what ended it: the original's
/// `except KeyboardInterrupt: exit(130)` is the one case where the exit code depends on *why*
/// the run ended rather than just whether `supervisor::run` returned `Ok`.
async fn run_agent(config: Config, interrupted: Arc<AtomicBool>) -> Result<(), InitError> {
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Received interrupt, shutting down...");
            interrupted.store(true, Ordering::SeqCst);
            let _ = shutdown_tx.send(());
        }
    });

    supervisor::run(config, shutdown_rx).await
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    agent_util::logging::setup_logging();
    if let Err(err) = agent_util::infra::setup_infra_endpoints(InfraConfig::default()) {
        log::error!("Failed to start admin endpoints: {err}");
        return ExitCode::from(2);
    }

    let config = match init_or_exit(&cli) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::from(2);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("Failed to start async runtime: {err}");
            return ExitCode::from(1);
        }
    };

    let interrupted = Arc::new(AtomicBool::new(false));
    let result = runtime.block_on(run_agent(config, interrupted.clone()));

    if interrupted.load(Ordering::SeqCst) {
        return ExitCode::from(130);
    }
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::from(2)
        }
    }
}
