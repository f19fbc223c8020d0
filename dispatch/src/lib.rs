// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

#![deny(warnings)]

mod dispatcher;
mod reconciler;
mod store;

pub use dispatcher::Dispatcher;
pub use reconciler::Reconciler;
pub use store::StateStore;
