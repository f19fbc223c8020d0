// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = prost_build::Config::new();
    config.bytes(["."]);

    tonic_build::configure()
        .build_client(false)
        .build_server(true)
        .compile_with_config(
            config,
            &["proto/mdt_dialout.proto", "proto/telemetry.proto"],
            &["proto"],
        )?;

    Ok(())
}
