//! # switchyard-core
//!
//! Foundation types shared by every switchyard crate:
//!
//! - [`wire`]: inbound request, outbound response, and server-pushed event envelopes
//! - [`errors`]: [`AppError`] with its internal-only detail and sanitized wire form
//! - [`i18n`]: user-facing message catalog keyed by message id
//! - [`ids`]: branded ID newtypes (`UserId`, `SessionId`, `ConnectionId`)
//! - [`constants`]: action names and package metadata

#![deny(unsafe_code)]

pub mod constants;
pub mod errors;
pub mod i18n;
pub mod ids;
pub mod wire;

pub use errors::{AppError, ErrorKind};
pub use ids::{ConnectionId, SessionId, UserId};
pub use wire::{Data, Status, WsErrorBody, WsEvent, WsRequest, WsResponse};
