//! # switchyard-server
//!
//! Axum HTTP + `WebSocket` transport around the switchyard router.
//!
//! - `/ws`: one [`switchyard_router::Connection`] per socket, fed to the router
//! - [`hub::Hub`]: live connection table and event fan-out
//! - [`actions`]: built-in actions (`ping`, statuses, typing)
//! - `/health` and `/metrics` endpoints
//! - Graceful shutdown via [`shutdown::ShutdownCoordinator`]

#![deny(unsafe_code)]

pub mod actions;
pub mod config;
pub mod errors;
pub mod health;
pub mod hub;
pub mod metrics;
pub mod server;
pub mod session;
pub mod shutdown;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use hub::Hub;
pub use server::SwitchyardServer;
