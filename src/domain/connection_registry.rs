//! Book-keeping for active connections.
//!
//! Sessions themselves are owned by their connection task; the registry only
//! records who is connected, so the listener can report and count them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::ConnectionId;

/// Metadata recorded for an accepted connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Peer address as reported by the transport, if known.
    pub peer: Option<String>,
    /// When the connection was accepted.
    pub connected_at: DateTime<Utc>,
}

impl ConnectionInfo {
    /// Records a connection accepted now.
    #[must_use]
    pub fn new(peer: Option<String>) -> Self {
        Self {
            peer,
            connected_at: Utc::now(),
        }
    }
}

/// Active connections keyed by [`ConnectionId`].
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionInfo>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection, returning any entry it replaced.
    pub async fn insert(
        &self,
        id: ConnectionId,
        info: ConnectionInfo,
    ) -> Option<ConnectionInfo> {
        self.connections.write().await.insert(id, info)
    }

    /// Deregisters a connection, returning its entry.
    pub async fn remove(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        self.connections.write().await.remove(&id)
    }

    /// Returns the number of active connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if no connection is active.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_remove_returns_info() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();

        let previous = registry
            .insert(id, ConnectionInfo::new(Some("127.0.0.1:5000".to_string())))
            .await;
        assert!(previous.is_none());

        let Some(info) = registry.remove(id).await else {
            panic!("connection should be registered");
        };
        assert_eq!(info.peer.as_deref(), Some("127.0.0.1:5000"));
        assert!(info.connected_at <= Utc::now());
    }

    #[tokio::test]
    async fn second_remove_finds_nothing() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();
        registry.insert(id, ConnectionInfo::new(None)).await;

        assert!(registry.remove(id).await.is_some());
        assert!(registry.remove(id).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn len_and_is_empty() {
        let registry = ConnectionRegistry::new();
        assert!(registry.is_empty().await);

        registry.insert(ConnectionId::new(), ConnectionInfo::new(None)).await;
        registry.insert(ConnectionId::new(), ConnectionInfo::new(None)).await;
        assert!(!registry.is_empty().await);
        assert_eq!(registry.len().await, 2);
    }
}
