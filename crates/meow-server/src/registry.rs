//! The live set of broadcast-receiving connections.

use std::collections::HashMap;
use std::sync::Arc;

use meow_core::ConnectionId;
use tokio::sync::RwLock;
use tracing::debug;

use crate::connection::Connection;

/// Connections that have been accepted and have not yet closed or failed.
///
/// Shared by the websocket handlers (add on accept, remove on disconnect) and
/// the broadcaster (remove on send failure). Add and remove are idempotent.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<Connection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection. Returns `false` if it was already present.
    pub async fn add(&self, connection: Arc<Connection>) -> bool {
        let mut conns = self.connections.write().await;
        if conns.contains_key(&connection.id) {
            return false;
        }
        debug!(conn_id = %connection.id, total = conns.len() + 1, "connection registered");
        let _ = conns.insert(connection.id.clone(), connection);
        true
    }

    /// Remove a connection by ID. Returns `false` if it was not present.
    pub async fn remove(&self, id: &ConnectionId) -> bool {
        let mut conns = self.connections.write().await;
        let removed = conns.remove(id).is_some();
        if removed {
            debug!(conn_id = %id, total = conns.len(), "connection unregistered");
        }
        removed
    }

    /// Whether `id` is a member.
    pub async fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.read().await.contains_key(id)
    }

    /// The current members, for one broadcast.
    pub async fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.connections.read().await.values().cloned().collect()
    }

    /// Number of members.
    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_and_remove() {
        let registry = ConnectionRegistry::new();
        let (a, _ra) = Connection::channel(1);
        let (b, _rb) = Connection::channel(1);

        assert!(registry.add(Arc::clone(&a)).await);
        assert!(registry.add(Arc::clone(&b)).await);
        assert_eq!(registry.count().await, 2);

        assert!(registry.remove(&a.id).await);
        assert!(!registry.contains(&a.id).await);
        assert!(registry.contains(&b.id).await);
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (a, _ra) = Connection::channel(1);
        assert!(registry.add(Arc::clone(&a)).await);
        assert!(!registry.add(Arc::clone(&a)).await);
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (a, _ra) = Connection::channel(1);
        assert!(!registry.remove(&a.id).await);
        let _ = registry.add(Arc::clone(&a)).await;
        assert!(registry.remove(&a.id).await);
        assert!(!registry.remove(&a.id).await);
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn snapshot_is_detached() {
        let registry = ConnectionRegistry::new();
        let (a, _ra) = Connection::channel(1);
        let _ = registry.add(Arc::clone(&a)).await;

        let snapshot = registry.snapshot().await;
        let (late, _rl) = Connection::channel(1);
        let _ = registry.add(late).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, a.id);
        assert_eq!(registry.count().await, 2);
    }

    #[tokio::test]
    async fn concurrent_adds() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut handles = Vec::new();
        let mut receivers = Vec::new();
        for _ in 0..32 {
            let (conn, rx) = Connection::channel(1);
            receivers.push(rx);
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move { registry.add(conn).await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(registry.count().await, 32);
    }
}
