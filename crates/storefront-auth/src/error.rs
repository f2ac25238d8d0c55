//! Authentication errors.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No user is signed in.
    #[error("not signed in")]
    NotAuthenticated,

    /// Session expired.
    #[error("session expired")]
    SessionExpired,

    /// The backend rejected the token.
    #[error("session rejected by the server")]
    Unauthorized,

    /// Token is malformed.
    #[error("invalid token: {0}")]
    InvalidToken(String),
}

impl AuthError {
    /// Check if the user has to sign in (again).
    pub fn requires_sign_in(&self) -> bool {
        matches!(
            self,
            AuthError::NotAuthenticated | AuthError::SessionExpired | AuthError::Unauthorized
        )
    }
}
