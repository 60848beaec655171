//! Concurrent set of live connections.
//!
//! [`ConnectionRegistry`] maps each [`ConnectionId`] to its shared
//! [`Connection`]. Membership means "believed reachable": a connection is
//! present from the transport open callback until it is removed by a close
//! callback, a failed send, or an administrative disconnect.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{Connection, ConnectionId};

/// Registry of live connections, the single source of broadcast targets.
///
/// # Concurrency
///
/// - The outer map is guarded by a `RwLock` held only for the map operation
///   itself, never across a send.
/// - [`Self::snapshot`] copies the member handles out, so broadcasts iterate
///   without holding the lock and tolerate concurrent add/remove.
/// - Per-connection send exclusivity lives on the [`Connection`] itself.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<Connection>>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a connection. Idempotent if it is already present.
    ///
    /// Returns `true` if the connection was newly added.
    pub async fn add(&self, connection: Arc<Connection>) -> bool {
        let mut map = self.connections.write().await;
        match map.entry(connection.id()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(connection);
                true
            }
        }
    }

    /// Removes a connection. Idempotent if it is absent.
    ///
    /// Returns the removed handle; only the caller that gets `Some` back
    /// owns the follow-up (close, removal event).
    pub async fn remove(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.write().await.remove(&id)
    }

    /// Returns `true` if the connection is currently a member.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }

    /// Returns the member with the given id.
    pub async fn get(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.read().await.get(&id).map(Arc::clone)
    }

    /// Returns a point-in-time view of all members for iteration.
    ///
    /// Connections added after the snapshot are not included. Connections
    /// removed after the snapshot are still listed, so senders must re-check
    /// membership under the connection's send lock.
    pub async fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.connections.read().await.values().map(Arc::clone).collect()
    }

    /// Returns the number of live connections.
    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;

    fn make_connection() -> Arc<Connection> {
        Arc::new(Connection::new(MockTransport::new()))
    }

    #[tokio::test]
    async fn add_and_contains() {
        let registry = ConnectionRegistry::new();
        let conn = make_connection();

        assert!(registry.add(Arc::clone(&conn)).await);
        assert!(registry.contains(conn.id()).await);
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let conn = make_connection();

        assert!(registry.add(Arc::clone(&conn)).await);
        assert!(!registry.add(Arc::clone(&conn)).await);
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let conn = make_connection();
        let _ = registry.add(Arc::clone(&conn)).await;

        assert!(registry.remove(conn.id()).await.is_some());
        assert!(registry.remove(conn.id()).await.is_none());
        assert!(!registry.contains(conn.id()).await);
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn remove_unknown_is_noop() {
        let registry = ConnectionRegistry::new();
        assert!(registry.remove(ConnectionId::new()).await.is_none());
    }

    #[tokio::test]
    async fn snapshot_is_stable_under_mutation() {
        let registry = ConnectionRegistry::new();
        let a = make_connection();
        let b = make_connection();
        let _ = registry.add(Arc::clone(&a)).await;
        let _ = registry.add(Arc::clone(&b)).await;

        let snapshot = registry.snapshot().await;
        let _ = registry.remove(a.id()).await;
        let _ = registry.add(make_connection()).await;

        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.count().await, 2);
        assert!(snapshot.iter().any(|c| c.id() == a.id()));
    }

    #[tokio::test]
    async fn get_returns_member_only() {
        let registry = ConnectionRegistry::new();
        let conn = make_connection();
        let _ = registry.add(Arc::clone(&conn)).await;

        let Some(found) = registry.get(conn.id()).await else {
            panic!("expected member");
        };
        assert_eq!(found.id(), conn.id());
        assert!(registry.get(ConnectionId::new()).await.is_none());
    }
}
