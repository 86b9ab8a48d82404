//! Wire-format envelopes exchanged over the WebSocket.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Free-form payload carried by requests, responses, and events.
pub type Data = Map<String, Value>;

/// Inbound envelope from a client.
///
/// Every field is defaulted so that structurally incomplete envelopes still
/// decode and can be rejected by the router with a proper error reply.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WsRequest {
    /// Action name selecting the handler.
    #[serde(default)]
    pub action: String,
    /// Client-assigned sequence number echoed on the reply.
    #[serde(default)]
    pub seq: i64,
    /// Action parameters.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Data,
}

impl WsRequest {
    /// Build a request with empty data.
    pub fn new(action: impl Into<String>, seq: i64) -> Self {
        Self {
            action: action.into(),
            seq,
            data: Data::new(),
        }
    }

    /// Attach a data payload.
    #[must_use]
    pub fn with_data(mut self, data: Data) -> Self {
        self.data = data;
        self
    }

    /// Fetch a string field from `data`.
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Data, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Data>::deserialize(deserializer)?.unwrap_or_default())
}

/// Outcome carried by a response envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// The request succeeded.
    Ok,
    /// The request was rejected.
    Error,
}

/// Outbound reply correlated to a request by `seq`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WsResponse {
    /// Success or failure.
    pub status: Status,
    /// Echo of the request's sequence number.
    pub seq: i64,
    /// Result payload, omitted when empty.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Data,
    /// Sanitized error, present only on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WsErrorBody>,
}

/// Error body inside a failed [`WsResponse`].
///
/// Deliberately has no field for internal detail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsErrorBody {
    /// Stable machine-readable code (e.g. `NoAction`).
    pub code: String,
    /// Localized text for the end user.
    pub user_message: String,
}

impl WsResponse {
    /// Build a success reply.
    pub fn ok(seq: i64, data: Data) -> Self {
        Self {
            status: Status::Ok,
            seq,
            data,
            error: None,
        }
    }

    /// Build a failure reply.
    pub fn error(seq: i64, body: WsErrorBody) -> Self {
        Self {
            status: Status::Error,
            seq,
            data: Data::new(),
            error: Some(body),
        }
    }

    /// Whether the reply reports success.
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

/// Server-pushed event not correlated to any request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsEvent {
    /// Event name (e.g. `typing`).
    pub event: String,
    /// User the event is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Channel the event is scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Event payload.
    #[serde(default)]
    pub data: Data,
}

impl WsEvent {
    /// Create an event with no user or channel scope.
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            user_id: None,
            channel_id: None,
            data: Data::new(),
        }
    }

    /// Attach the originating user.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Attach the channel scope.
    #[must_use]
    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_data(mut self, data: Data) -> Self {
        self.data = data;
        self
    }
}
