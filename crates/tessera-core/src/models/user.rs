//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub username: String,
    pub email: Option<String>,
    /// Argon2id PHC string. `None` for federation-only accounts.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Binds a newly created user to an auth client through a synthetic
/// identity whose subject is the user's own id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityBinding {
    pub auth_client_id: Uuid,
    pub provider: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub username: String,
    pub email: Option<String>,
    /// Already hashed; repositories never see plaintext passwords.
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub metadata: Option<serde_json::Value>,
    /// Created in the same transaction as the user when present.
    pub identity: Option<IdentityBinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub username: Option<String>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub email: Option<Option<String>>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
    pub email_verified: Option<bool>,
    pub metadata: Option<serde_json::Value>,
}
