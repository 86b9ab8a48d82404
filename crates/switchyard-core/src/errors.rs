//! Application errors reported back to a peer.
//!
//! An [`AppError`] carries two messages: a user-facing one from the message
//! catalog and an internal `detailed_error` meant only for the operational
//! log. The wire conversion never includes the detail.

use serde::{Deserialize, Serialize};

use crate::i18n;
use crate::wire::{WsErrorBody, WsResponse};

/// Stable error codes sent to the peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Envelope has an empty action.
    NoAction,
    /// Envelope has a non-positive sequence number.
    BadSequence,
    /// Action requires an authenticated connection.
    NotAuthenticated,
    /// No handler registered for the action.
    BadAction,
    /// Handler rejected the request data.
    InvalidParam,
    /// Handler failed for a reason the peer can't act on.
    Internal,
}

impl ErrorKind {
    /// Machine-readable code placed on the wire.
    pub fn code(self) -> &'static str {
        match self {
            Self::NoAction => "NoAction",
            Self::BadSequence => "BadSequence",
            Self::NotAuthenticated => "NotAuthenticated",
            Self::BadAction => "BadAction",
            Self::InvalidParam => "InvalidParam",
            Self::Internal => "Internal",
        }
    }

    /// Default catalog message id for this kind.
    pub fn message_id(self) -> &'static str {
        match self {
            Self::NoAction => i18n::NO_ACTION,
            Self::BadSequence => i18n::BAD_SEQ,
            Self::NotAuthenticated => i18n::NOT_AUTHENTICATED,
            Self::BadAction => i18n::BAD_ACTION,
            Self::InvalidParam => i18n::INVALID_PARAM,
            Self::Internal => i18n::INTERNAL,
        }
    }
}

/// Error produced while routing or handling one request.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{location}: {user_message}")]
pub struct AppError {
    /// Error code.
    pub kind: ErrorKind,
    /// Catalog id the user message was resolved from.
    pub message_id: String,
    /// Where the error was raised (e.g. `Router::dispatch`).
    pub location: String,
    /// Localized text for the peer.
    pub user_message: String,
    /// Internal detail. Logged, never transmitted.
    pub detailed_error: String,
}

impl AppError {
    /// Create an error using the kind's default message id.
    pub fn new(kind: ErrorKind, location: impl Into<String>, details: impl Into<String>) -> Self {
        Self::with_message_id(kind, kind.message_id(), location, details)
    }

    /// Create an error with an explicit catalog message id.
    pub fn with_message_id(
        kind: ErrorKind,
        message_id: impl Into<String>,
        location: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        let message_id = message_id.into();
        let user_message = i18n::translate(&message_id).to_owned();
        Self {
            kind,
            message_id,
            location: location.into(),
            user_message,
            detailed_error: details.into(),
        }
    }

    /// Shorthand for a handler-side invalid parameter error.
    pub fn invalid_param(location: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParam, location, details)
    }

    /// Shorthand for a handler-side internal error.
    pub fn internal(location: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, location, details)
    }

    /// Wire code for this error.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Drop the internal detail.
    pub fn clear_details(&mut self) {
        self.detailed_error.clear();
    }

    /// Convert into the sanitized wire body.
    pub fn to_error_body(&self) -> WsErrorBody {
        WsErrorBody {
            code: self.code().to_owned(),
            user_message: self.user_message.clone(),
        }
    }

    /// Build the error reply for the request with sequence `seq`.
    pub fn to_response(&self, seq: i64) -> WsResponse {
        WsResponse::error(seq, self.to_error_body())
    }
}
