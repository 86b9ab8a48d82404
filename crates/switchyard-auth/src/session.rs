//! Login sessions and token lookup.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use switchyard_core::{SessionId, UserId};
use tracing::{debug, info};

use crate::errors::{AuthError, Result};

/// Current time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A login session bound to a bearer token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session identifier.
    pub id: SessionId,
    /// Bearer token presented by clients.
    pub token: String,
    /// Owner of the session.
    pub user_id: UserId,
    /// Creation time (ms since epoch).
    #[serde(default)]
    pub created_at: i64,
    /// Expiry time (ms since epoch). `<= 0` means the session never expires.
    #[serde(default)]
    pub expires_at: i64,
}

impl Session {
    /// Create a session for `user_id`, expiring after `ttl` (never if `None`).
    pub fn new(user_id: impl Into<UserId>, token: impl Into<String>, ttl: Option<Duration>) -> Self {
        let created_at = now_ms();
        let expires_at = ttl.map_or(0, |ttl| {
            created_at.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
        });
        Self {
            id: SessionId::new(),
            token: token.into(),
            user_id: user_id.into(),
            created_at,
            expires_at,
        }
    }

    /// Whether the session had expired at `now` (ms since epoch).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at > 0 && now > self.expires_at
    }

    /// Whether the session has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_ms())
    }
}

/// Resolves bearer tokens to sessions.
///
/// Expired sessions may be returned; callers decide how to treat them.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up the session for `token`.
    async fn get_session(&self, token: &str) -> Option<Session>;
}

/// Concurrent in-memory session store keyed by token.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a session. Returns the previous session for the token.
    pub fn insert(&self, session: Session) -> Result<Option<Session>> {
        validate(&session)?;
        Ok(self.sessions.insert(session.token.clone(), session))
    }

    /// Revoke the session for `token`.
    pub fn revoke(&self, token: &str) -> Option<Session> {
        self.sessions.remove(token).map(|(_, session)| session)
    }

    /// Number of stored sessions (including expired ones).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = now_ms();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
        before - self.sessions.len()
    }

    /// Load sessions from a JSON array file.
    pub fn load_seed_file(&self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let sessions: Vec<Session> = serde_json::from_str(&content)?;
        sessions.iter().try_for_each(validate)?;
        let count = sessions.len();
        for session in sessions {
            let _ = self.sessions.insert(session.token.clone(), session);
        }
        info!(?path, count, "seeded session store");
        Ok(count)
    }
}

fn validate(session: &Session) -> Result<()> {
    if session.token.is_empty() {
        return Err(AuthError::InvalidSession(format!(
            "session {} has an empty token",
            session.id
        )));
    }
    Ok(())
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_session(&self, token: &str) -> Option<Session> {
        let found = self.sessions.get(token).map(|entry| entry.value().clone());
        if found.is_none() {
            debug!("session token not found");
        }
        found
    }
}
