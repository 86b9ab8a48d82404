//! `SwitchyardServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use switchyard_router::Router;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::hub::Hub;
use crate::metrics::WS_CONNECTIONS_REJECTED_TOTAL;
use crate::session::run_ws_session;
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Action router every session dispatches through.
    pub router: Arc<Router>,
    /// Live connection table.
    pub hub: Arc<Hub>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    /// One permit per allowed concurrent connection.
    pub slots: Arc<Semaphore>,
}

/// The switchyard server.
pub struct SwitchyardServer {
    state: AppState,
}

impl SwitchyardServer {
    /// Create a server around a populated router.
    ///
    /// `hub` must be the one given to [`crate::actions::register_builtin`] so
    /// broadcasts reach this server's connections.
    pub fn new(config: ServerConfig, router: Router, hub: Arc<Hub>) -> Self {
        let slots = Arc::new(Semaphore::new(config.max_connections));
        Self {
            state: AppState {
                router: Arc::new(router),
                hub,
                config: Arc::new(config),
                shutdown: Arc::new(ShutdownCoordinator::new()),
                start_time: Instant::now(),
                metrics: None,
                slots,
            },
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.state.metrics = Some(handle);
        self
    }

    /// Build the Axum app with all routes.
    pub fn app(&self) -> axum::Router {
        axum::Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let addr = self.state.config.bind_addr();
        let bind_err = |source| ServerError::Bind {
            addr: addr.clone(),
            source,
        };
        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        let app = self.app();
        let token = self.state.shutdown.token();
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "server terminated with error");
            }
        });

        info!(%local_addr, "switchyard listening");
        Ok((local_addr, handle))
    }

    /// Get the connection hub.
    pub fn hub(&self) -> &Arc<Hub> {
        &self.state.hub
    }

    /// Get the action router.
    pub fn router(&self) -> &Arc<Router> {
        &self.state.router
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.shutdown.is_shutting_down() {
        return (StatusCode::SERVICE_UNAVAILABLE, "server shutting down").into_response();
    }
    let Ok(slot) = Arc::clone(&state.slots).try_acquire_owned() else {
        counter!(WS_CONNECTIONS_REJECTED_TOTAL).increment(1);
        warn!(
            max_connections = state.config.max_connections,
            "connection limit reached, refusing upgrade"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    };

    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| run_ws_session(socket, state, slot))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.hub.connection_count().await;
    let authenticated = state.hub.authenticated_count().await;
    Json(health::health_check(state.start_time, connections, authenticated))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use switchyard_auth::{InMemoryPresence, InMemorySessionStore};
    use tower::ServiceExt;

    fn make_server() -> SwitchyardServer {
        let router = Router::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemoryPresence::new()),
        );
        SwitchyardServer::new(ServerConfig::default(), router, Arc::new(Hub::new()))
    }

    async fn get_body(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn health_endpoint_reports_counts() {
        let server = make_server();
        let (status, body) = get_body(server.app(), "/health").await;
        assert_eq!(status, StatusCode::OK);

        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 0);
        assert_eq!(parsed["authenticated"], 0);
        assert!(parsed["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn metrics_endpoint_without_recorder_is_404() {
        let server = make_server();
        let (status, _) = get_body(server.app(), "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_handle() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let server = make_server().with_metrics(handle);
        let (status, _) = get_body(server.app(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn ws_without_upgrade_headers_is_rejected() {
        let server = make_server();
        let (status, _) = get_body(server.app(), "/ws").await;
        assert!(status.is_client_error(), "got {status}");
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let server = make_server();
        let (status, _) = get_body(server.app(), "/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_binds_ephemeral_port_and_stops() {
        let server = make_server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);

        server.shutdown().shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("shutdown timed out")
            .expect("join error");
    }

    #[tokio::test]
    async fn listen_reports_bind_failure() {
        let router = Router::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemoryPresence::new()),
        );
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = ServerConfig {
            port: taken.local_addr().unwrap().port(),
            ..ServerConfig::default()
        };
        let server = SwitchyardServer::new(config, router, Arc::new(Hub::new()));
        let err = server.listen().await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
    }

    #[test]
    fn accessors() {
        let server = make_server();
        assert_eq!(server.config().port, 0);
        assert!(server.router().actions().is_empty());
        assert!(!server.shutdown().is_shutting_down());
    }
}
