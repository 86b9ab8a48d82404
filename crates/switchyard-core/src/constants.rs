//! Package-level constants.

/// Current version of switchyard (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The handshake action that exchanges a session token for an authenticated connection.
pub const AUTHENTICATION_CHALLENGE: &str = "authentication_challenge";

/// Key in the challenge request's `data` that carries the session token.
pub const TOKEN_FIELD: &str = "token";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_semver() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert_eq!(parts.len(), 3, "VERSION must be semver (MAJOR.MINOR.PATCH)");
        for part in parts {
            let _: u32 = part.parse().expect("each semver segment must be a number");
        }
    }

    #[test]
    fn challenge_action_name() {
        assert_eq!(AUTHENTICATION_CHALLENGE, "authentication_challenge");
    }
}
