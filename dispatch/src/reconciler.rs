// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cloud::Binding;
use telemetry::{Session, VrrpState};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::store::StateStore;

/// Periodically re-applies bound actions in precheck mode against every currently-active
/// session, so externally-induced drift is corrected. Runs on a single dedicated task, not the
/// dispatcher's worker pool - reconciliation is serialised across sessions by design.
pub struct Reconciler {
    bindings: Arc<HashMap<Session, Binding>>,
    store: Arc<StateStore>,
    interval: Duration,
}

impl Reconciler {
    pub fn new(
        bindings: Arc<HashMap<Session, Binding>>,
        store: Arc<StateStore>,
        interval: Duration,
    ) -> Self {
        Reconciler {
            bindings,
            store,
            interval,
        }
    }

    /// Run the reconciliation loop until `shutdown` is notified.
    pub async fn run(self, mut shutdown: watch::Receiver<()>) {
        let mut last_start = Instant::now();
        loop {
            let elapsed = last_start.elapsed();
            let sleep_for = self
                .interval
                .checked_sub(elapsed)
                .unwrap_or(Duration::ZERO)
                .max(Duration::from_secs(1));

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = shutdown.changed() => return,
            }

            last_start = Instant::now();
            self.reconcile_once().await;
        }
    }

    async fn reconcile_once(&self) {
        for session in self.store.keys() {
            if self.store.get(&session) != Some(VrrpState::Active) {
                continue;
            }
            let Some(binding) = self.bindings.get(&session) else {
                continue;
            };
            if let Err(err) = binding.apply(true).await {
                log::error!("Reconciliation failed for session {session}: {err}");
            }
        }
    }
}
