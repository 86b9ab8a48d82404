//! User-facing message catalog.
//!
//! Errors carry a message id; the catalog turns it into the text shown to
//! the peer. Only English ships today. Unknown ids fall back to the id itself
//! so a missing entry is visible rather than blank.

/// Message id for an envelope with an empty action.
pub const NO_ACTION: &str = "api.web_socket_router.no_action.app_error";
/// Message id for a non-positive sequence number.
pub const BAD_SEQ: &str = "api.web_socket_router.bad_seq.app_error";
/// Message id for an action sent before the handshake.
pub const NOT_AUTHENTICATED: &str = "api.web_socket_router.not_authenticated.app_error";
/// Message id for an unregistered action.
pub const BAD_ACTION: &str = "api.web_socket_router.bad_action.app_error";
/// Message id for a handler rejecting its request data.
pub const INVALID_PARAM: &str = "api.web_socket_handler.invalid_param.app_error";
/// Message id for a handler failing internally.
pub const INTERNAL: &str = "api.web_socket_handler.internal.app_error";

/// Look up the English text for a message id.
pub fn translate(id: &str) -> &str {
    match id {
        NO_ACTION => "No websocket action",
        BAD_SEQ => "Invalid sequence for websocket message",
        NOT_AUTHENTICATED => "Not authenticated. Please log in and try again.",
        BAD_ACTION => "Unknown websocket action",
        INVALID_PARAM => "Invalid or missing parameter in websocket request",
        INTERNAL => "An internal error occurred while handling the websocket request",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ids_translate() {
        assert_eq!(translate(NO_ACTION), "No websocket action");
        assert_eq!(translate(BAD_ACTION), "Unknown websocket action");
        assert!(translate(NOT_AUTHENTICATED).starts_with("Not authenticated"));
    }

    #[test]
    fn every_catalog_id_has_text() {
        for id in [NO_ACTION, BAD_SEQ, NOT_AUTHENTICATED, BAD_ACTION, INVALID_PARAM, INTERNAL] {
            assert_ne!(translate(id), id, "missing catalog entry for {id}");
        }
    }

    #[test]
    fn unknown_id_falls_back_to_id() {
        assert_eq!(translate("some.unknown.id"), "some.unknown.id");
    }
}
