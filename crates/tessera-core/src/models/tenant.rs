//! Tenant domain model.
//!
//! Tenants are the isolation boundary: users, roles and identity
//! providers all belong to exactly one tenant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    /// The organization this tenant belongs to.
    pub organization_id: Uuid,
    pub name: String,
    /// URL-safe identifier, unique within the organization.
    pub slug: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    pub organization_id: Uuid,
    pub name: String,
    pub slug: String,
    pub metadata: Option<serde_json::Value>,
}
