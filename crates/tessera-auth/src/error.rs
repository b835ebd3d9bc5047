//! Authentication error types.
//!
//! Variants carry the precise internal cause. Conversion into
//! [`TesseraError`] collapses them to what a caller may see.

use tessera_core::error::TesseraError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid client credentials")]
    InvalidClient,

    #[error("account is inactive")]
    AccountInactive,

    #[error("invalid or expired reset token")]
    ResetTokenInvalid,

    #[error("reset token has expired")]
    ResetTokenExpired,

    #[error("reset token has been revoked")]
    ResetTokenRevoked,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("{0}")]
    WeakPassword(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for TesseraError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::WeakPassword(message) => TesseraError::Validation { message },
            AuthError::Crypto(msg) => TesseraError::Crypto(msg),
            other => TesseraError::InvalidCredential {
                reason: other.to_string(),
            },
        }
    }
}
