//! Action registry and per-request dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use switchyard_auth::{PresenceService, SessionStore};
use switchyard_core::constants::{AUTHENTICATION_CHALLENGE, TOKEN_FIELD};
use switchyard_core::{AppError, Data, ErrorKind, WsRequest, WsResponse};
use tracing::{debug, info, instrument};

use crate::connection::Connection;
use crate::error_log::{ErrorLog, TracingErrorLog, report_error};
use crate::handler::{ActionHandler, ApiHandler, Handler};

const LOCATION: &str = "Router::dispatch";

/// Maps action names to handlers and runs every inbound request through
/// validation, the authentication gate, and handler lookup.
///
/// Populate with [`Router::register`] at startup, then share behind an `Arc`.
pub struct Router {
    handlers: HashMap<String, Arc<dyn Handler>>,
    sessions: Arc<dyn SessionStore>,
    presence: Arc<dyn PresenceService>,
    error_log: Arc<dyn ErrorLog>,
}

impl Router {
    /// Create an empty router that logs errors through `tracing`.
    pub fn new(sessions: Arc<dyn SessionStore>, presence: Arc<dyn PresenceService>) -> Self {
        Self {
            handlers: HashMap::new(),
            sessions,
            presence,
            error_log: Arc::new(TracingErrorLog),
        }
    }

    /// Replace the operational error log.
    #[must_use]
    pub fn with_error_log(mut self, error_log: Arc<dyn ErrorLog>) -> Self {
        self.error_log = error_log;
        self
    }

    /// The error log handlers should report through.
    pub fn error_log(&self) -> Arc<dyn ErrorLog> {
        Arc::clone(&self.error_log)
    }

    /// The presence service used on successful handshakes.
    pub fn presence(&self) -> Arc<dyn PresenceService> {
        Arc::clone(&self.presence)
    }

    /// Register a handler for `action`. A later registration replaces an earlier one.
    pub fn register(&mut self, action: &str, handler: impl Handler + 'static) {
        debug_assert!(!action.is_empty(), "action name must not be empty");
        let _ = self.handlers.insert(action.to_owned(), Arc::new(handler));
    }

    /// Register an [`ActionHandler`], wrapped so its result becomes the reply.
    pub fn register_action(&mut self, action: &str, handler: impl ActionHandler + 'static) {
        let wrapped = ApiHandler::new(handler, self.error_log());
        self.register(action, wrapped);
    }

    /// Registered action names (sorted).
    pub fn actions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether `action` has a handler.
    pub fn has_action(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Route one request received on `conn`.
    ///
    /// Each rejected request yields exactly one error reply on `conn` and no
    /// handler call. The handshake action is handled here and closes the
    /// connection without a reply when the token is missing or unusable.
    #[instrument(skip_all, fields(conn_id = %conn.id, action = %request.action, seq = request.seq))]
    pub async fn dispatch(&self, conn: &Connection, request: WsRequest) {
        if request.action.is_empty() {
            self.return_error(conn, &request, ErrorKind::NoAction, "");
            return;
        }

        if request.seq <= 0 {
            let details = format!("seq={}", request.seq);
            self.return_error(conn, &request, ErrorKind::BadSequence, details);
            return;
        }

        if request.action == AUTHENTICATION_CHALLENGE {
            self.authentication_challenge(conn, &request).await;
            return;
        }

        if !conn.is_authenticated() {
            let details = format!("action={}", request.action);
            self.return_error(conn, &request, ErrorKind::NotAuthenticated, details);
            return;
        }

        let Some(handler) = self.handlers.get(&request.action) else {
            let details = format!("action={}", request.action);
            self.return_error(conn, &request, ErrorKind::BadAction, details);
            return;
        };

        counter!("ws_requests_total", "action" => request.action.clone()).increment(1);
        debug!("dispatching to handler");
        handler.serve(conn, &request).await;
    }

    /// Exchange a session token for an authenticated identity.
    async fn authentication_challenge(&self, conn: &Connection, request: &WsRequest) {
        let Some(token) = request.str_param(TOKEN_FIELD) else {
            counter!("ws_auth_total", "outcome" => "malformed").increment(1);
            debug!("challenge without a string token, closing connection");
            conn.close();
            return;
        };

        // A session with an empty token cannot mark the connection authenticated.
        let session = match self.sessions.get_session(token).await {
            Some(session) if !session.is_expired() && !session.token.is_empty() => session,
            found => {
                counter!("ws_auth_total", "outcome" => "rejected").increment(1);
                debug!(found = found.is_some(), "challenge token rejected, closing connection");
                conn.close();
                return;
            }
        };

        let presence = Arc::clone(&self.presence);
        let user_id = session.user_id.clone();
        let session_id = session.id.clone();
        conn.track_presence_update(tokio::spawn(async move {
            presence.set_status_online(&user_id, &session_id, false).await;
        }));

        conn.authenticate(&session.token, &session.user_id);
        counter!("ws_auth_total", "outcome" => "success").increment(1);
        info!(user_id = %session.user_id, "connection authenticated");

        let _ = conn.send_response(&WsResponse::ok(request.seq, Data::new()));
    }

    fn return_error(
        &self,
        conn: &Connection,
        request: &WsRequest,
        kind: ErrorKind,
        details: impl Into<String>,
    ) {
        let err = AppError::new(kind, LOCATION, details);
        report_error(self.error_log.as_ref(), conn, request.seq, err);
    }
}
