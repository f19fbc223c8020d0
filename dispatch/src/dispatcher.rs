// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::HashMap;
use std::sync::Arc;

use cloud::Binding;
use telemetry::{Session, VrrpEvent, VrrpState};
use tokio::sync::Semaphore;

use crate::store::StateStore;

/// Maximum supported session count: a compromise between parallelism and context-switching,
/// not a hard protocol limit.
const WORKER_POOL_SIZE: usize = 8;

/// Edge-triggered handler: on `Inactive -> Active`, submits the session's bound action to a
/// fixed-size worker pool and records the new state unconditionally.
pub struct Dispatcher {
    bindings: Arc<HashMap<Session, Binding>>,
    store: Arc<StateStore>,
    worker_slots: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(bindings: Arc<HashMap<Session, Binding>>, store: Arc<StateStore>) -> Self {
        Dispatcher {
            bindings,
            store,
            worker_slots: Arc::new(Semaphore::new(WORKER_POOL_SIZE)),
        }
    }

    pub fn bindings(&self) -> &Arc<HashMap<Session, Binding>> {
        &self.bindings
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Handle one VRRP event. Unknown sessions are logged at debug and otherwise ignored,
    /// leaving the state store and worker pool untouched.
    pub fn on_event(&self, event: VrrpEvent) {
        let Some(binding) = self.bindings.get(&event.session) else {
            log::debug!("Ignoring event for unregistered session {}", event.session);
            return;
        };

        let prev = self.store.set(event.session.clone(), event.state);
        if prev == Some(VrrpState::Inactive) && event.state == VrrpState::Active {
            self.submit_go_active(event.session, binding.clone());
        }
    }

    fn submit_go_active(&self, session: Session, binding: Binding) {
        let worker_slots = self.worker_slots.clone();
        if worker_slots.available_permits() == 0 {
            log::warn!(
                "No free worker slot for go-active on session {session}; event may be delayed"
            );
        }

        tokio::spawn(async move {
            let _permit = worker_slots
                .acquire_owned()
                .await
                .expect("worker pool semaphore should never be closed");
            if let Err(err) = binding.apply(false).await {
                log::error!("Go-active action failed for session {session}: {err}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use cloud::{Action, CloudClient, CloudError, EniInfo, Provider, RouteInfo, RouteMutationError};
    use ipnetwork::Ipv4Network;

    use super::*;

    #[derive(Default)]
    struct CountingProvider {
        assign_calls: AtomicUsize,
    }

    #[async_trait]
    impl Provider for CountingProvider {
        async fn describe_instance_enis(
            &self,
            _instance_id: &str,
        ) -> Result<HashMap<i32, String>, CloudError> {
            Ok(HashMap::from([(0, "eni-local".to_owned())]))
        }

        async fn describe_eni(&self, eni_id: &str) -> Result<EniInfo, CloudError> {
            Ok(EniInfo {
                eni_id: eni_id.to_owned(),
                private_ips: vec![],
            })
        }

        async fn assign_private_ip(&self, _eni_id: &str, _ip: Ipv4Addr) -> Result<(), CloudError> {
            self.assign_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn describe_route_table(&self, _route_table_id: &str) -> Result<Vec<RouteInfo>, CloudError> {
            Ok(vec![])
        }

        async fn replace_route(
            &self,
            _route_table_id: &str,
            _destination: Ipv4Network,
            _target_eni: &str,
        ) -> Result<(), RouteMutationError> {
            Ok(())
        }

        async fn create_route(
            &self,
            _route_table_id: &str,
            _destination: Ipv4Network,
            _target_eni: &str,
        ) -> Result<(), RouteMutationError> {
            Ok(())
        }
    }

    fn session(interface: &str, vrid: u8) -> Session {
        Session {
            interface: interface.to_owned(),
            vrid,
        }
    }

    async fn dispatcher_with_one_binding() -> (Dispatcher, Session) {
        let provider = Arc::new(CountingProvider::default());
        let client = Arc::new(
            CloudClient::with_provider(provider, "i-local".to_owned())
                .await
                .unwrap(),
        );
        let s = session("Hun0/0/0/1", 1);
        let binding = Binding {
            action: Action::AssignVip {
                device_index: 0,
                vip: "10.0.2.100".parse().unwrap(),
            },
            client,
        };
        let bindings = Arc::new(HashMap::from([(s.clone(), binding)]));
        let store = Arc::new(StateStore::new(bindings.keys().cloned()));
        (Dispatcher::new(bindings, store), s)
    }

    #[tokio::test]
    async fn go_active_edge_updates_state_and_submits_action() {
        let (dispatcher, s) = dispatcher_with_one_binding().await;

        dispatcher.on_event(VrrpEvent {
            session: s.clone(),
            state: VrrpState::Active,
        });
        assert_eq!(dispatcher.store().get(&s), Some(VrrpState::Active));

        // Let the spawned go-active task run.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn unknown_session_is_ignored() {
        let (dispatcher, _s) = dispatcher_with_one_binding().await;
        let unknown = session("Hun0/0/0/9", 9);

        dispatcher.on_event(VrrpEvent {
            session: unknown.clone(),
            state: VrrpState::Active,
        });
        assert_eq!(dispatcher.store().get(&unknown), None);
    }

    #[tokio::test]
    async fn active_to_active_is_not_an_edge() {
        let (dispatcher, s) = dispatcher_with_one_binding().await;

        dispatcher.on_event(VrrpEvent {
            session: s.clone(),
            state: VrrpState::Active,
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        // Second Active event for an already-Active session is not a go-active edge; state
        // simply stays Active.
        dispatcher.on_event(VrrpEvent {
            session: s.clone(),
            state: VrrpState::Active,
        });
        assert_eq!(dispatcher.store().get(&s), Some(VrrpState::Active));
    }

    #[tokio::test]
    async fn disconnect_resets_every_session_to_inactive() {
        let (dispatcher, s) = dispatcher_with_one_binding().await;
        dispatcher.on_event(VrrpEvent {
            session: s.clone(),
            state: VrrpState::Active,
        });
        dispatcher.store().reset_all_to_inactive();
        assert_eq!(dispatcher.store().get(&s), Some(VrrpState::Inactive));
    }
}
