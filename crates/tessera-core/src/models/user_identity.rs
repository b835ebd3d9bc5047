//! Provider-bound user identities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provider name of the synthetic identity created with every user.
pub const DEFAULT_PROVIDER: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub auth_client_id: Uuid,
    pub provider: String,
    /// Subject identifier at the provider.
    pub subject: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
