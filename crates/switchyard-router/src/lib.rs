//! # switchyard-router
//!
//! Routes inbound envelopes on one connection to registered action handlers.
//!
//! - [`Connection`]: identity plus the outbound queue a writer task drains
//! - [`Router`]: validates, authenticates, and dispatches each request
//! - [`Handler`] / [`ActionHandler`]: the handler seam and its reply-producing adapter
//! - [`ErrorLog`]: operational sink for every reportable error

#![deny(unsafe_code)]

pub mod connection;
pub mod error_log;
pub mod handler;
pub mod router;

pub use connection::{Connection, Identity};
pub use error_log::{ErrorLog, ErrorLogEntry, TracingErrorLog};
pub use handler::{ActionHandler, ApiHandler, Handler};
pub use router::Router;
