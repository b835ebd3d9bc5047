//! Identity provider domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant-scoped grouping of auth clients representing one source of
/// identities. At most one provider per tenant carries `is_default`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProvider {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    /// Stable identifier presented by callers (globally unique).
    pub external_id: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIdentityProvider {
    pub tenant_id: Uuid,
    pub name: String,
    pub external_id: String,
    pub is_default: bool,
}
