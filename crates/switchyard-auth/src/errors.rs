//! Auth error types.

/// Errors raised while loading session data.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Seed file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A seeded session is unusable.
    #[error("invalid session: {0}")]
    InvalidSession(String),
}

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;
