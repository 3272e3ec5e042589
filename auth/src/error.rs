//! Error types for password and token operations.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Failures raised while hashing passwords or issuing/verifying tokens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Password did not match the stored hash.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Token is malformed or its signature does not verify.
    #[error("Invalid token")]
    InvalidToken,

    /// Token signature verified but it is past its expiry.
    #[error("Token has expired")]
    TokenExpired,

    /// Stored password hash could not be parsed.
    #[error("Malformed password hash: {0}")]
    MalformedHash(String),

    /// Hashing or signing primitive failed.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Configuration error (e.g. empty signing secret).
    #[error("Configuration error: {0}")]
    Config(String),
}
