//! Auth client domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClientType {
    Public,
    Confidential,
    Service,
}

/// A registered application bound to one identity provider.
///
/// `domain` is the token issuer value. A client without a domain cannot
/// mint tokens and is never returned by resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClient {
    pub id: Uuid,
    pub identity_provider_id: Uuid,
    /// Denormalized from the identity provider.
    pub tenant_id: Uuid,
    /// Unique per identity provider.
    pub name: String,
    pub display_name: String,
    pub client_type: ClientType,
    pub domain: Option<String>,
    pub redirect_uri: Option<String>,
    /// Opaque public identifier presented by callers.
    pub client_id: String,
    /// SHA-256 hex digest of the client secret.
    pub client_secret_hash: String,
    pub config: serde_json::Value,
    pub is_active: bool,
    /// Default clients are immutable once created.
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuthClient {
    pub identity_provider_id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub display_name: String,
    pub client_type: ClientType,
    pub domain: Option<String>,
    pub redirect_uri: Option<String>,
    pub client_id: String,
    pub client_secret_hash: String,
    pub config: Option<serde_json::Value>,
    pub is_active: bool,
    pub is_default: bool,
}

/// Fields that can be updated on a non-default client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateAuthClient {
    pub name: Option<String>,
    pub display_name: Option<String>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub domain: Option<Option<String>>,
    pub redirect_uri: Option<Option<String>>,
    pub config: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}
