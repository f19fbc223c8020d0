// Copyright 2023 Toolchain Labs, Inc. All rights reserved.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::HashMap;

use parking_lot::Mutex;
use telemetry::{Session, VrrpState};

/// In-memory `session -> VrrpState` map, with an entry for every bound session, initialised to
/// `Inactive`. The only permitted mutations are the dispatcher setting a session's state on
/// every handled event, and the disconnect handler resetting every entry to `Inactive`; the key
/// set itself is fixed for the store's lifetime.
pub struct StateStore {
    sessions: Mutex<HashMap<Session, VrrpState>>,
}

impl StateStore {
    pub fn new(bound_sessions: impl IntoIterator<Item = Session>) -> Self {
        let sessions = bound_sessions
            .into_iter()
            .map(|session| (session, VrrpState::Inactive))
            .collect();
        StateStore {
            sessions: Mutex::new(sessions),
        }
    }

    pub fn get(&self, session: &Session) -> Option<VrrpState> {
        self.sessions.lock().get(session).copied()
    }

    /// Set `session`'s state, returning the value it held immediately before. Only valid for a
    /// session already present in the store (i.e. one that is also a key in the bindings map).
    pub fn set(&self, session: Session, new_state: VrrpState) -> Option<VrrpState> {
        self.sessions.lock().insert(session, new_state)
    }

    /// Reset every bound session to `Inactive`, as invoked by the telemetry disconnect handler.
    pub fn reset_all_to_inactive(&self) {
        for state in self.sessions.lock().values_mut() {
            *state = VrrpState::Inactive;
        }
    }

    /// A snapshot of the key set at the moment of the call. The reconciler iterates this
    /// snapshot and re-reads each key's value individually, so a value changing concurrently
    /// under the snapshot is fine; only the key set itself is fixed.
    pub fn keys(&self) -> Vec<Session> {
        self.sessions.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(interface: &str, vrid: u8) -> Session {
        Session {
            interface: interface.to_owned(),
            vrid,
        }
    }

    #[test]
    fn new_sessions_start_inactive() {
        let store = StateStore::new([session("Hun0/0/0/1", 1)]);
        assert_eq!(store.get(&session("Hun0/0/0/1", 1)), Some(VrrpState::Inactive));
    }

    #[test]
    fn unknown_session_returns_none() {
        let store = StateStore::new([session("Hun0/0/0/1", 1)]);
        assert_eq!(store.get(&session("Hun0/0/0/9", 9)), None);
    }

    #[test]
    fn set_returns_previous_value() {
        let store = StateStore::new([session("Hun0/0/0/1", 1)]);
        let prev = store.set(session("Hun0/0/0/1", 1), VrrpState::Active);
        assert_eq!(prev, Some(VrrpState::Inactive));
        assert_eq!(store.get(&session("Hun0/0/0/1", 1)), Some(VrrpState::Active));
    }

    #[test]
    fn reset_all_to_inactive_clears_every_session() {
        let store = StateStore::new([session("a", 1), session("b", 2)]);
        store.set(session("a", 1), VrrpState::Active);
        store.set(session("b", 2), VrrpState::Active);
        store.reset_all_to_inactive();
        assert_eq!(store.get(&session("a", 1)), Some(VrrpState::Inactive));
        assert_eq!(store.get(&session("b", 2)), Some(VrrpState::Inactive));
    }

    #[test]
    fn keys_snapshot_is_stable_key_set() {
        let store = StateStore::new([session("a", 1), session("b", 2)]);
        let mut keys = store.keys();
        keys.sort_by(|a, b| a.interface.cmp(&b.interface));
        assert_eq!(keys, vec![session("a", 1), session("b", 2)]);
    }
}
