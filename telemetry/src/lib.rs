// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

#![deny(warnings)]

mod decode;
mod error;
mod gpbkv;
mod server;
mod service;
mod types;

pub use error::WireError;
pub use server::serve;
pub use service::VrrpServicer;
pub use types::{Session, VrrpEvent, VrrpState};
