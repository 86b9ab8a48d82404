//! Built-in actions registered by the server.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use switchyard_auth::{PresenceService, UserStatus};
use switchyard_core::constants::VERSION;
use switchyard_core::{AppError, Data, UserId, WsEvent, WsRequest};
use switchyard_router::{ActionHandler, Connection, Router};

use crate::hub::Hub;

/// Action name for the liveness probe.
pub const PING: &str = "ping";
/// Action name for every known user's status.
pub const GET_STATUSES: &str = "get_statuses";
/// Action name for the status of selected users.
pub const GET_STATUSES_BY_IDS: &str = "get_statuses_by_ids";
/// Action name for typing notifications.
pub const USER_TYPING: &str = "user_typing";

/// Register every built-in action on `router`.
pub fn register_builtin(router: &mut Router, hub: Arc<Hub>) {
    let presence = router.presence();
    router.register_action(PING, Ping);
    router.register_action(
        GET_STATUSES,
        GetStatuses {
            presence: Arc::clone(&presence),
        },
    );
    router.register_action(GET_STATUSES_BY_IDS, GetStatusesByIds { presence });
    router.register_action(USER_TYPING, UserTyping { hub });
}

fn status_map(statuses: Vec<UserStatus>) -> Data {
    statuses
        .into_iter()
        .map(|s| (s.user_id.into_inner(), Value::from(s.status.as_str())))
        .collect()
}

/// `ping`: replies with `pong` and the server version.
pub struct Ping;

#[async_trait]
impl ActionHandler for Ping {
    async fn handle(&self, _conn: &Connection, _request: &WsRequest) -> Result<Data, AppError> {
        let mut data = Data::new();
        let _ = data.insert("text".into(), json!("pong"));
        let _ = data.insert("version".into(), json!(VERSION));
        Ok(data)
    }
}

/// `get_statuses`: user id to status for every known user.
pub struct GetStatuses {
    presence: Arc<dyn PresenceService>,
}

#[async_trait]
impl ActionHandler for GetStatuses {
    async fn handle(&self, _conn: &Connection, _request: &WsRequest) -> Result<Data, AppError> {
        Ok(status_map(self.presence.statuses().await))
    }
}

/// `get_statuses_by_ids`: user id to status for `data.user_ids`.
pub struct GetStatusesByIds {
    presence: Arc<dyn PresenceService>,
}

#[async_trait]
impl ActionHandler for GetStatusesByIds {
    async fn handle(&self, _conn: &Connection, request: &WsRequest) -> Result<Data, AppError> {
        const LOCATION: &str = "GetStatusesByIds::handle";

        let Some(raw) = request.data.get("user_ids").and_then(Value::as_array) else {
            return Err(AppError::invalid_param(LOCATION, "user_ids must be an array"));
        };
        if raw.is_empty() {
            return Err(AppError::invalid_param(LOCATION, "user_ids is empty"));
        }

        let mut user_ids = Vec::with_capacity(raw.len());
        for value in raw {
            match value.as_str() {
                Some(id) if !id.is_empty() => user_ids.push(UserId::from(id)),
                _ => {
                    return Err(AppError::invalid_param(
                        LOCATION,
                        format!("invalid user id {value}"),
                    ));
                }
            }
        }

        Ok(status_map(self.presence.statuses_by_ids(&user_ids).await))
    }
}

/// `user_typing`: tells every other authenticated user that this one is typing.
pub struct UserTyping {
    hub: Arc<Hub>,
}

#[async_trait]
impl ActionHandler for UserTyping {
    async fn handle(&self, conn: &Connection, request: &WsRequest) -> Result<Data, AppError> {
        let Some(channel_id) = request.str_param("channel_id").filter(|c| !c.is_empty()) else {
            return Err(AppError::invalid_param(
                "UserTyping::handle",
                "channel_id is required",
            ));
        };
        let parent_id = request.str_param("parent_id").unwrap_or_default();

        let user_id = conn.user_id();
        let mut data = Data::new();
        let _ = data.insert("parentId".into(), json!(parent_id));
        let event = WsEvent::new("typing")
            .with_user(user_id.clone())
            .with_channel(channel_id)
            .with_data(data);
        let _ = self.hub.broadcast(&event, Some(&user_id)).await;

        Ok(Data::new())
    }
}
