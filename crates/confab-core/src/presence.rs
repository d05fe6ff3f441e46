use std::collections::HashSet;

use dashmap::DashMap;

/// What a connect/disconnect meant for the user's visible presence.
/// Only the 0->1 and 1->0 edges are externally observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceTransition {
    CameOnline,
    WentOffline,
    NoChange,
}

/// Derived view of who currently has at least one live connection.
/// Never authoritative: recomputed purely from connection lifecycle
/// events. Mutations for one user are serialized by the map's per-entry
/// locking, so concurrent connects and disconnects cannot lose updates.
#[derive(Default)]
pub struct PresenceRegistry {
    connections: DashMap<i64, HashSet<u64>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connect(&self, user_id: i64, conn_id: u64) -> PresenceTransition {
        let mut entry = self.connections.entry(user_id).or_default();
        let was_empty = entry.is_empty();
        entry.insert(conn_id);
        if was_empty {
            PresenceTransition::CameOnline
        } else {
            PresenceTransition::NoChange
        }
    }

    /// Idempotent: dropping an unknown connection is a no-op, so a
    /// disconnect racing an in-flight teardown cannot double-report.
    pub fn on_disconnect(&self, user_id: i64, conn_id: u64) -> PresenceTransition {
        let Some(mut entry) = self.connections.get_mut(&user_id) else {
            return PresenceTransition::NoChange;
        };
        if !entry.remove(&conn_id) {
            return PresenceTransition::NoChange;
        }
        let now_empty = entry.is_empty();
        drop(entry);
        if now_empty {
            self.connections
                .remove_if(&user_id, |_, conns| conns.is_empty());
            PresenceTransition::WentOffline
        } else {
            PresenceTransition::NoChange
        }
    }

    pub fn is_online(&self, user_id: i64) -> bool {
        self.connections
            .get(&user_id)
            .map(|conns| !conns.is_empty())
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> Vec<i64> {
        self.connections
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| *entry.key())
            .collect()
    }
}
