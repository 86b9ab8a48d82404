//! # switchyard-auth
//!
//! Collaborators the router consults during the authentication handshake:
//!
//! - [`SessionStore`]: resolves a bearer token to a [`Session`]
//! - [`PresenceService`]: records users going online/offline
//!
//! Both are traits so the router can be tested without a live backend.
//! In-memory implementations ([`InMemorySessionStore`], [`InMemoryPresence`])
//! back the standalone server.

#![deny(unsafe_code)]

pub mod errors;
pub mod presence;
pub mod session;

pub use errors::{AuthError, Result};
pub use presence::{InMemoryPresence, Presence, PresenceService, UserStatus};
pub use session::{InMemorySessionStore, Session, SessionStore, now_ms};
