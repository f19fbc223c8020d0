// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use tracing_subscriber::filter::targets::Targets;
use tracing_subscriber::prelude::*;

/// Configure logging for the agent binary.
///
/// Honors `RUST_LOG` (default `info`). Uses JSON formatting so that log lines are easy to
/// ingest by a container log pipeline; see `grpc_util::logging` in the original workspace for
/// the pattern this is adapted from.
pub fn setup_logging() {
    let directive = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned());
    let filter_layer = directive
        .parse::<Targets>()
        .expect("Failed to parse RUST_LOG");

    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_filter(filter_layer);

    tracing_subscriber::registry().with(fmt_layer).init();
}
