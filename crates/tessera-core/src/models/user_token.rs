//! Typed, time-bounded user secrets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UserTokenType {
    PasswordReset,
}

impl UserTokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserTokenType::PasswordReset => "password-reset",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "password-reset" => Some(UserTokenType::PasswordReset),
            _ => None,
        }
    }
}

/// A single-use secret owned by one user.
///
/// Only the SHA-256 digest of the secret is stored. Tokens are revoked,
/// never deleted, so the table doubles as an audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserToken {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub token_type: UserTokenType,
    pub token_hash: String,
    /// `None` = non-expiring.
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl UserToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserToken {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub token_type: UserTokenType,
    pub token_hash: String,
    pub expires_at: Option<DateTime<Utc>>,
}
