//! Handler seam and the reply-producing adapter.

use std::sync::Arc;

use async_trait::async_trait;
use switchyard_core::{AppError, Data, WsRequest, WsResponse};

use crate::connection::Connection;
use crate::error_log::{ErrorLog, report_error};

/// Implemented by everything the router can dispatch to.
///
/// Handlers are only invoked for authenticated connections and registered
/// actions. They produce their own replies on the connection's queue.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Serve one request.
    async fn serve(&self, conn: &Connection, request: &WsRequest);
}

/// A handler that returns its result instead of enqueuing it.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Compute the reply data for one request.
    async fn handle(&self, conn: &Connection, request: &WsRequest) -> Result<Data, AppError>;
}

/// Adapts an [`ActionHandler`] into a [`Handler`].
///
/// `Ok(data)` becomes an `OK` reply; `Err` goes through the same
/// log-then-sanitize path as router errors.
pub struct ApiHandler<H> {
    inner: H,
    error_log: Arc<dyn ErrorLog>,
}

impl<H: ActionHandler> ApiHandler<H> {
    /// Wrap `inner`, reporting its errors to `error_log`.
    pub fn new(inner: H, error_log: Arc<dyn ErrorLog>) -> Self {
        Self { inner, error_log }
    }
}

#[async_trait]
impl<H: ActionHandler> Handler for ApiHandler<H> {
    async fn serve(&self, conn: &Connection, request: &WsRequest) {
        match self.inner.handle(conn, request).await {
            Ok(data) => {
                let _ = conn.send_response(&WsResponse::ok(request.seq, data));
            }
            Err(err) => report_error(self.error_log.as_ref(), conn, request.seq, err),
        }
    }
}
