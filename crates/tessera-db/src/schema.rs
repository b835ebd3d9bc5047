//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs are stored as
//! strings; enums as strings guarded by ASSERT constraints.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "credential_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Organizations and tenants
-- =======================================================================
DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD name ON TABLE organization TYPE string;
DEFINE FIELD slug ON TABLE organization TYPE string;
DEFINE FIELD metadata ON TABLE organization TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_organization_slug ON TABLE organization \
    COLUMNS slug UNIQUE;

DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE tenant TYPE string;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD slug ON TABLE tenant TYPE string;
DEFINE FIELD metadata ON TABLE tenant TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_org_slug ON TABLE tenant \
    COLUMNS organization_id, slug UNIQUE;

-- =======================================================================
-- Identity providers and auth clients
-- =======================================================================
DEFINE TABLE identity_provider SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE identity_provider TYPE string;
DEFINE FIELD name ON TABLE identity_provider TYPE string;
DEFINE FIELD external_id ON TABLE identity_provider TYPE string;
DEFINE FIELD is_default ON TABLE identity_provider TYPE bool \
    DEFAULT false;
DEFINE FIELD created_at ON TABLE identity_provider TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE identity_provider TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_idp_external_id ON TABLE identity_provider \
    COLUMNS external_id UNIQUE;
DEFINE INDEX idx_idp_tenant ON TABLE identity_provider \
    COLUMNS tenant_id;

DEFINE TABLE auth_client SCHEMAFULL;
DEFINE FIELD identity_provider_id ON TABLE auth_client TYPE string;
DEFINE FIELD tenant_id ON TABLE auth_client TYPE string;
DEFINE FIELD name ON TABLE auth_client TYPE string;
DEFINE FIELD display_name ON TABLE auth_client TYPE string;
DEFINE FIELD client_type ON TABLE auth_client TYPE string \
    ASSERT $value IN ['Public', 'Confidential', 'Service'];
DEFINE FIELD domain ON TABLE auth_client TYPE option<string>;
DEFINE FIELD redirect_uri ON TABLE auth_client TYPE option<string>;
DEFINE FIELD client_id ON TABLE auth_client TYPE string;
DEFINE FIELD client_secret_hash ON TABLE auth_client TYPE string;
DEFINE FIELD config ON TABLE auth_client TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD is_active ON TABLE auth_client TYPE bool DEFAULT true;
DEFINE FIELD is_default ON TABLE auth_client TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE auth_client TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE auth_client TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_auth_client_client_id ON TABLE auth_client \
    COLUMNS client_id UNIQUE;
DEFINE INDEX idx_auth_client_idp_name ON TABLE auth_client \
    COLUMNS identity_provider_id, name UNIQUE;

-- =======================================================================
-- Users and their owned records (tenant scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE user TYPE string;
DEFINE FIELD organization_id ON TABLE user TYPE string;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE option<string>;
DEFINE FIELD password_hash ON TABLE user TYPE option<string>;
DEFINE FIELD is_active ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD email_verified ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD metadata ON TABLE user TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_tenant_username ON TABLE user \
    COLUMNS tenant_id, username UNIQUE;
DEFINE INDEX idx_user_tenant_email ON TABLE user \
    COLUMNS tenant_id, email;

DEFINE TABLE user_identity SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE user_identity TYPE string;
DEFINE FIELD user_id ON TABLE user_identity TYPE string;
DEFINE FIELD auth_client_id ON TABLE user_identity TYPE string;
DEFINE FIELD provider ON TABLE user_identity TYPE string;
DEFINE FIELD subject ON TABLE user_identity TYPE string;
DEFINE FIELD metadata ON TABLE user_identity TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_at ON TABLE user_identity TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_identity_user ON TABLE user_identity \
    COLUMNS tenant_id, user_id;
DEFINE INDEX idx_identity_client_subject ON TABLE user_identity \
    COLUMNS auth_client_id, provider, subject UNIQUE;

DEFINE TABLE user_token SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE user_token TYPE string;
DEFINE FIELD user_id ON TABLE user_token TYPE string;
DEFINE FIELD token_type ON TABLE user_token TYPE string \
    ASSERT $value IN ['password-reset'];
DEFINE FIELD token_hash ON TABLE user_token TYPE string;
DEFINE FIELD expires_at ON TABLE user_token TYPE option<datetime>;
DEFINE FIELD revoked ON TABLE user_token TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE user_token TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_token_hash ON TABLE user_token \
    COLUMNS token_hash UNIQUE;
DEFINE INDEX idx_user_token_owner ON TABLE user_token \
    COLUMNS user_id, token_type, revoked;

-- =======================================================================
-- Roles and memberships (tenant scope)
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE role TYPE string;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE string;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_tenant_name ON TABLE role \
    COLUMNS tenant_id, name UNIQUE;

DEFINE TABLE tenant_member SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE tenant_member TYPE string;
DEFINE FIELD user_id ON TABLE tenant_member TYPE string;
DEFINE FIELD role ON TABLE tenant_member TYPE string \
    ASSERT $value IN ['Admin', 'Member'];
DEFINE FIELD created_at ON TABLE tenant_member TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_member_unique ON TABLE tenant_member \
    COLUMNS tenant_id, user_id UNIQUE;

-- User -> Role assignment
DEFINE TABLE has_role TYPE RELATION SCHEMAFULL;
DEFINE INDEX idx_has_role_unique ON TABLE has_role \
    COLUMNS in, out UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);
    debug!(current_version, "Schema version");

    for migration in MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version)
    {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }

    #[test]
    fn reset_tokens_are_indexed_by_digest() {
        assert!(SCHEMA_V1.contains("idx_user_token_hash ON TABLE user_token"));
        assert!(SCHEMA_V1.contains("COLUMNS token_hash UNIQUE"));
    }
}
