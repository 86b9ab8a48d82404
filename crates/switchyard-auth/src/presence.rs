//! User presence (online / away / offline) tracking.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use switchyard_core::{SessionId, UserId};
use tracing::debug;

use crate::session::now_ms;

/// Presence state of a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// Connected and active.
    Online,
    /// Connected but idle, or set away by the user.
    Away,
    /// No live connection.
    Offline,
}

impl Presence {
    /// Wire name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Offline => "offline",
        }
    }
}

/// Last known presence of one user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatus {
    /// User the status belongs to.
    pub user_id: UserId,
    /// Current presence.
    pub status: Presence,
    /// Whether the user chose this status explicitly.
    pub manual: bool,
    /// Last status change (ms since epoch).
    pub last_activity_at: i64,
}

impl UserStatus {
    fn offline(user_id: UserId) -> Self {
        Self {
            user_id,
            status: Presence::Offline,
            manual: false,
            last_activity_at: 0,
        }
    }
}

/// Records presence changes. Calls are side effects whose results nobody waits on.
#[async_trait]
pub trait PresenceService: Send + Sync {
    /// Mark `user_id` online because `session_id` authenticated.
    async fn set_status_online(&self, user_id: &UserId, session_id: &SessionId, manual: bool);

    /// Mark `user_id` offline.
    async fn set_status_offline(&self, user_id: &UserId, manual: bool);

    /// Status of every known user.
    async fn statuses(&self) -> Vec<UserStatus>;

    /// Status of the given users; unknown users report offline.
    async fn statuses_by_ids(&self, user_ids: &[UserId]) -> Vec<UserStatus>;
}

/// In-process presence table.
#[derive(Default)]
pub struct InMemoryPresence {
    statuses: DashMap<UserId, UserStatus>,
}

impl InMemoryPresence {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status of `user_id`, if known.
    pub fn get(&self, user_id: &UserId) -> Option<UserStatus> {
        self.statuses.get(user_id).map(|entry| entry.value().clone())
    }

    /// Apply a status change. A manual non-online status survives automatic updates.
    fn apply(&self, user_id: &UserId, status: Presence, manual: bool) {
        let mut entry = self
            .statuses
            .entry(user_id.clone())
            .or_insert_with(|| UserStatus::offline(user_id.clone()));
        let current = entry.value_mut();
        if current.manual && current.status != Presence::Online && !manual {
            debug!(user_id = %user_id, ?status, "keeping manual status");
            return;
        }
        current.status = status;
        current.manual = manual;
        current.last_activity_at = now_ms();
    }
}

#[async_trait]
impl PresenceService for InMemoryPresence {
    async fn set_status_online(&self, user_id: &UserId, session_id: &SessionId, manual: bool) {
        debug!(user_id = %user_id, session_id = %session_id, manual, "status online");
        self.apply(user_id, Presence::Online, manual);
    }

    async fn set_status_offline(&self, user_id: &UserId, manual: bool) {
        debug!(user_id = %user_id, manual, "status offline");
        self.apply(user_id, Presence::Offline, manual);
    }

    async fn statuses(&self) -> Vec<UserStatus> {
        let mut all: Vec<UserStatus> = self.statuses.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        all
    }

    async fn statuses_by_ids(&self, user_ids: &[UserId]) -> Vec<UserStatus> {
        user_ids
            .iter()
            .map(|id| self.get(id).unwrap_or_else(|| UserStatus::offline(id.clone())))
            .collect()
    }
}
