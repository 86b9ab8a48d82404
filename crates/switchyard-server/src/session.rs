//! WebSocket session lifecycle: one connected client from upgrade through
//! disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use switchyard_auth::PresenceService;
use switchyard_core::{UserId, WsRequest};
use switchyard_router::Connection;
use tokio::sync::{OwnedSemaphorePermit, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::hub::Hub;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL, WS_MALFORMED_TOTAL,
};
use crate::server::AppState;

/// How long teardown waits for the writer to flush and send Close.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Why a session's read pump stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// The client sent Close or the stream ended.
    ClientClosed,
    /// The router or the writer asked for the connection to close.
    ClosedByServer,
    /// The server is shutting down.
    Shutdown,
    /// A frame could not be decoded into a request.
    Malformed,
    /// The socket reported an error.
    SocketError,
}

/// Outcome of decoding one inbound frame.
#[derive(Debug)]
pub enum Inbound {
    /// A request for the router.
    Request(WsRequest),
    /// A control frame; nothing to dispatch.
    Control,
    /// The client is closing.
    Close,
    /// The frame is not a request envelope.
    Malformed(String),
}

/// Decode one frame. Text and UTF-8 binary frames carry JSON requests.
pub fn decode_frame(msg: &Message) -> Inbound {
    let text = match msg {
        Message::Text(t) => t.as_str(),
        Message::Binary(data) => match std::str::from_utf8(data) {
            Ok(s) => s,
            Err(_) => return Inbound::Malformed(format!("non-UTF8 binary frame ({} bytes)", data.len())),
        },
        Message::Close(_) => return Inbound::Close,
        Message::Ping(_) | Message::Pong(_) => return Inbound::Control,
    };
    match serde_json::from_str::<WsRequest>(text) {
        Ok(request) => Inbound::Request(request),
        Err(e) => Inbound::Malformed(e.to_string()),
    }
}

/// Run a WebSocket session for a connected client.
///
/// 1. Registers a [`Connection`] with the hub
/// 2. Dispatches each decoded frame through the router, in arrival order
/// 3. Forwards the connection's outbound queue to the socket, with pings
/// 4. Stops on client close, malformed input, a close request, heartbeat
///    timeout, or server shutdown
/// 5. Marks the user offline if this was their last authenticated connection
#[instrument(skip_all, fields(conn_id = tracing::field::Empty))]
pub async fn run_ws_session(ws: WebSocket, state: AppState, _slot: OwnedSemaphorePermit) {
    let (ws_tx, mut ws_rx) = ws.split();

    let (send_tx, send_rx) = mpsc::channel::<Arc<String>>(state.config.send_queue_capacity);
    let connection = Arc::new(Connection::new(send_tx));
    let _ = tracing::Span::current().record("conn_id", tracing::field::display(&connection.id));

    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
    state.hub.add(Arc::clone(&connection)).await;

    let writer = tokio::spawn(write_pump(
        ws_tx,
        send_rx,
        Arc::clone(&connection),
        state.config.heartbeat_interval(),
        state.config.heartbeat_timeout(),
    ));

    let close = connection.close_token();
    let shutdown = state.shutdown.token();
    let reason = loop {
        let frame = tokio::select! {
            biased;
            () = close.cancelled() => break EndReason::ClosedByServer,
            () = shutdown.cancelled() => break EndReason::Shutdown,
            frame = ws_rx.next() => frame,
        };
        let msg = match frame {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                debug!(error = %e, "socket error");
                break EndReason::SocketError;
            }
            None => break EndReason::ClientClosed,
        };
        connection.mark_alive();

        match decode_frame(&msg) {
            Inbound::Request(request) => state.router.dispatch(&connection, request).await,
            Inbound::Control => {}
            Inbound::Close => break EndReason::ClientClosed,
            Inbound::Malformed(reason) => {
                warn!(%reason, "malformed frame, closing connection");
                counter!(WS_MALFORMED_TOTAL).increment(1);
                break EndReason::Malformed;
            }
        }
    };

    connection.close();
    if !stop_task(writer, WRITER_DRAIN_TIMEOUT).await {
        debug!("writer did not finish in time, aborted");
    }

    let _ = state.hub.remove(&connection.id).await;
    mark_offline_if_last(&connection, &state.hub, state.router.presence().as_ref()).await;

    info!(?reason, dropped = connection.drop_count(), "client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());
}

/// Wait up to `grace` for `task` to finish, aborting it otherwise.
///
/// Returns whether the task finished on its own. Once this returns the task
/// is no longer running.
async fn stop_task<T>(mut task: JoinHandle<T>, grace: Duration) -> bool {
    if tokio::time::timeout(grace, &mut task).await.is_ok() {
        return true;
    }
    task.abort();
    let _ = task.await;
    false
}

/// Mark the user offline if `connection` was their last authenticated one.
///
/// A handshake presence update still in flight is cancelled first so it
/// cannot land after the offline update.
async fn mark_offline_if_last(connection: &Connection, hub: &Hub, presence: &dyn PresenceService) {
    if let Some(pending) = connection.take_presence_update() {
        let _ = stop_task(pending, Duration::ZERO).await;
    }
    if !connection.is_authenticated() {
        return;
    }
    let user_id = connection.user_id();
    if hub.user_connection_count(&user_id).await == 0 {
        presence.set_status_offline(&UserId::from(user_id), false).await;
    }
}

/// Drain the outbound queue to the socket and keep the client alive with pings.
///
/// Queued messages are written before a close request is honoured, so a
/// reply enqueued ahead of the close still reaches the client.
async fn write_pump(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut send_rx: mpsc::Receiver<Arc<String>>,
    connection: Arc<Connection>,
    ping_every: Duration,
    pong_timeout: Duration,
) {
    let close = connection.close_token();
    let mut ping_interval = tokio::time::interval(ping_every);
    let _ = ping_interval.tick().await;

    loop {
        tokio::select! {
            biased;
            msg = send_rx.recv() => {
                let Some(text) = msg else { break };
                if ws_tx.send(Message::Text(String::clone(&text).into())).await.is_err() {
                    break;
                }
            }
            () = close.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
            _ = ping_interval.tick() => {
                if !connection.check_alive() && connection.last_pong_elapsed() > pong_timeout {
                    warn!(timeout = ?pong_timeout, "client unresponsive, disconnecting");
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
                if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    connection.close();
    let _ = ws_tx.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use switchyard_auth::{InMemoryPresence, Presence};
    use switchyard_core::SessionId;

    #[test]
    fn text_frame_decodes_request() {
        let msg = Message::Text(r#"{"action":"ping","seq":1}"#.into());
        assert_matches!(decode_frame(&msg), Inbound::Request(r) if r.action == "ping" && r.seq == 1);
    }

    #[test]
    fn utf8_binary_frame_decodes_request() {
        let msg = Message::Binary(br#"{"action":"ping","seq":2}"#.to_vec().into());
        assert_matches!(decode_frame(&msg), Inbound::Request(r) if r.seq == 2);
    }

    #[test]
    fn structurally_empty_object_still_decodes() {
        let msg = Message::Text("{}".into());
        assert_matches!(decode_frame(&msg), Inbound::Request(r) if r.action.is_empty() && r.seq == 0);
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert_matches!(decode_frame(&Message::Text("not json".into())), Inbound::Malformed(_));
        assert_matches!(decode_frame(&Message::Text("[1,2]".into())), Inbound::Malformed(_));
        assert_matches!(
            decode_frame(&Message::Text(r#"{"action":"ping","seq":"1"}"#.into())),
            Inbound::Malformed(_)
        );
    }

    #[test]
    fn non_utf8_binary_is_malformed() {
        let msg = Message::Binary(vec![0xff, 0xfe].into());
        assert_matches!(decode_frame(&msg), Inbound::Malformed(reason) if reason.contains("2 bytes"));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_task_aborts_stuck_task() {
        let held = Arc::new(());
        let inner = Arc::clone(&held);
        let task = tokio::spawn(async move {
            let _held = inner;
            std::future::pending::<()>().await;
        });

        assert!(!stop_task(task, Duration::from_secs(2)).await);
        assert_eq!(Arc::strong_count(&held), 1);
    }

    #[tokio::test]
    async fn stop_task_reports_finished_task() {
        assert!(stop_task(tokio::spawn(async {}), Duration::from_secs(2)).await);
    }

    fn authenticated(user: &str) -> (Arc<Connection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(4);
        let conn = Arc::new(Connection::new(tx));
        conn.authenticate("tok", &UserId::from(user));
        (conn, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn late_online_update_cannot_override_offline() {
        let presence = Arc::new(InMemoryPresence::new());
        let (conn, _rx) = authenticated("u1");
        let delayed = Arc::clone(&presence);
        conn.track_presence_update(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            delayed
                .set_status_online(&UserId::from("u1"), &SessionId::new(), false)
                .await;
        }));

        mark_offline_if_last(&conn, &Hub::new(), presence.as_ref()).await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let status = presence.get(&UserId::from("u1")).unwrap();
        assert_eq!(status.status, Presence::Offline);
    }

    #[tokio::test]
    async fn user_with_another_connection_stays_online() {
        let presence = InMemoryPresence::new();
        let hub = Hub::new();
        let (closing, _rx1) = authenticated("u1");
        let (remaining, _rx2) = authenticated("u1");
        hub.add(remaining).await;
        presence
            .set_status_online(&UserId::from("u1"), &SessionId::new(), false)
            .await;

        mark_offline_if_last(&closing, &hub, &presence).await;

        assert_eq!(presence.get(&UserId::from("u1")).unwrap().status, Presence::Online);
    }

    #[tokio::test]
    async fn unauthenticated_connection_leaves_presence_alone() {
        let presence = InMemoryPresence::new();
        let (tx, _rx) = mpsc::channel(4);
        let conn = Connection::new(tx);

        mark_offline_if_last(&conn, &Hub::new(), &presence).await;

        assert!(presence.statuses().await.is_empty());
    }

    #[test]
    fn control_and_close_frames() {
        assert_matches!(decode_frame(&Message::Ping(Vec::new().into())), Inbound::Control);
        assert_matches!(decode_frame(&Message::Pong(Vec::new().into())), Inbound::Control);
        assert_matches!(decode_frame(&Message::Close(None)), Inbound::Close);
    }
}
