//! Live connection table and event fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use switchyard_core::{ConnectionId, WsEvent};
use switchyard_router::Connection;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::metrics::WS_BROADCAST_DROPS_TOTAL;

/// Tracks every open connection and pushes events to them.
pub struct Hub {
    connections: RwLock<HashMap<ConnectionId, Arc<Connection>>>,
}

impl Hub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection.
    pub async fn add(&self, connection: Arc<Connection>) {
        let mut conns = self.connections.write().await;
        let _ = conns.insert(connection.id.clone(), connection);
    }

    /// Remove a connection by ID.
    pub async fn remove(&self, connection_id: &ConnectionId) -> Option<Arc<Connection>> {
        self.connections.write().await.remove(connection_id)
    }

    /// Look up a connection by ID.
    pub async fn get(&self, connection_id: &ConnectionId) -> Option<Arc<Connection>> {
        self.connections.read().await.get(connection_id).cloned()
    }

    /// Number of open connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Number of connections that completed the handshake.
    pub async fn authenticated_count(&self) -> usize {
        self.connections
            .read()
            .await
            .values()
            .filter(|c| c.is_authenticated())
            .count()
    }

    /// Number of authenticated connections speaking for `user_id`.
    pub async fn user_connection_count(&self, user_id: &str) -> usize {
        self.connections
            .read()
            .await
            .values()
            .filter(|c| c.is_authenticated() && c.user_id() == user_id)
            .count()
    }

    /// Push `event` to every authenticated connection, skipping those of
    /// `exclude_user`. Returns how many connections accepted it.
    pub async fn broadcast(&self, event: &WsEvent, exclude_user: Option<&str>) -> usize {
        let json = match serde_json::to_string(event) {
            Ok(j) => Arc::new(j),
            Err(e) => {
                warn!(event = %event.event, error = %e, "failed to serialize event");
                return 0;
            }
        };
        let conns = self.connections.read().await;
        let mut delivered = 0;
        for conn in conns.values() {
            if !conn.is_authenticated() {
                continue;
            }
            if exclude_user.is_some_and(|user| conn.user_id() == user) {
                continue;
            }
            if conn.send(Arc::clone(&json)) {
                delivered += 1;
            } else {
                counter!(WS_BROADCAST_DROPS_TOTAL).increment(1);
                warn!(conn_id = %conn.id, event = %event.event, "failed to send event to client");
            }
        }
        debug!(event = %event.event, delivered, "broadcast event");
        delivered
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
