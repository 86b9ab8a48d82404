//! Per-client connection state shared between the transport and the router.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use switchyard_core::{ConnectionId, UserId, WsResponse};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Who a connection speaks for. Empty fields mean unauthenticated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Identity {
    /// Session token presented in the handshake.
    pub session_token: String,
    /// User owning the session.
    pub user_id: String,
}

impl Identity {
    /// Whether the handshake has completed.
    pub fn is_authenticated(&self) -> bool {
        !self.session_token.is_empty()
    }
}

/// A connected client.
pub struct Connection {
    /// Unique connection ID.
    pub id: ConnectionId,
    identity: Mutex<Identity>,
    /// Send channel to the connection's writer task.
    tx: mpsc::Sender<Arc<String>>,
    /// Cancelled when the connection should be torn down.
    close: CancellationToken,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Whether the client has responded since the last heartbeat check.
    is_alive: AtomicBool,
    last_pong: Mutex<Instant>,
    dropped_messages: AtomicU64,
    presence_update: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Create an unauthenticated connection with a fresh ID.
    pub fn new(tx: mpsc::Sender<Arc<String>>) -> Self {
        Self::with_id(ConnectionId::new(), tx)
    }

    /// Create an unauthenticated connection with a given ID.
    pub fn with_id(id: ConnectionId, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            identity: Mutex::new(Identity::default()),
            tx,
            close: CancellationToken::new(),
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
            presence_update: Mutex::new(None),
        }
    }

    /// Snapshot of the current identity.
    pub fn identity(&self) -> Identity {
        self.identity.lock().clone()
    }

    /// Session token, empty until authenticated.
    pub fn session_token(&self) -> String {
        self.identity.lock().session_token.clone()
    }

    /// User ID, empty until authenticated.
    pub fn user_id(&self) -> String {
        self.identity.lock().user_id.clone()
    }

    /// Whether the handshake has completed on this connection.
    pub fn is_authenticated(&self) -> bool {
        self.identity.lock().is_authenticated()
    }

    /// Record a successful handshake.
    pub fn authenticate(&self, session_token: &str, user_id: &UserId) {
        let mut identity = self.identity.lock();
        identity.session_token = session_token.to_owned();
        identity.user_id = user_id.as_str().to_owned();
    }

    /// Remember the in-flight presence update started by the handshake.
    pub fn track_presence_update(&self, handle: JoinHandle<()>) {
        *self.presence_update.lock() = Some(handle);
    }

    /// Take the in-flight presence update, if any.
    pub fn take_presence_update(&self) -> Option<JoinHandle<()>> {
        self.presence_update.lock().take()
    }

    /// Enqueue a text message for the writer task.
    ///
    /// Never blocks. Returns `false` if the queue is full or closed, and
    /// increments the dropped message counter.
    pub fn send(&self, message: Arc<String>) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Serialize a value and enqueue it.
    pub fn send_json<T: Serialize>(&self, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.send(Arc::new(json)),
            Err(e) => {
                warn!(conn_id = %self.id, error = %e, "failed to serialize outbound message");
                false
            }
        }
    }

    /// Enqueue a reply envelope.
    pub fn send_response(&self, response: &WsResponse) -> bool {
        let sent = self.send_json(response);
        if !sent {
            warn!(conn_id = %self.id, seq = response.seq, "failed to enqueue response");
        }
        sent
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Ask the transport to close this connection.
    pub fn close(&self) {
        self.close.cancel();
    }

    /// Whether a close has been requested.
    pub fn is_closed(&self) -> bool {
        self.close.is_cancelled()
    }

    /// Token cancelled when a close is requested.
    pub fn close_token(&self) -> CancellationToken {
        self.close.clone()
    }

    /// Mark the connection as alive (pong or any frame received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Check and reset the alive flag for heartbeat.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Duration since the last pong (or connection establishment).
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
