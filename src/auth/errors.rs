//! # Auth Errors

use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors raised around admin authentication.
///
/// A wrong or missing credential is not an error; it is an
/// [`AuthOutcome`](super::AuthOutcome).
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The HMAC key could not be initialised
    #[error("Internal error: invalid HMAC key")]
    InvalidKey,

    /// Credential verified but the signed body is not the expected JSON
    #[error("Malformed admin request: {0}")]
    MalformedPayload(String),
}

impl AuthError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::MalformedPayload(_) => 400,
            AuthError::InvalidKey => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidKey => "COMMENTS_AUTH_INVALID_KEY",
            AuthError::MalformedPayload(_) => "COMMENTS_AUTH_MALFORMED_PAYLOAD",
        }
    }
}
