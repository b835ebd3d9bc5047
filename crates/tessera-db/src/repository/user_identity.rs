//! SurrealDB implementation of [`UserIdentityRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tessera_core::error::TesseraResult;
use tessera_core::models::user_identity::UserIdentity;
use tessera_core::repository::UserIdentityRepository;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct UserIdentityRow {
    record_id: String,
    tenant_id: String,
    user_id: String,
    auth_client_id: String,
    provider: String,
    subject: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl UserIdentityRow {
    fn try_into_identity(self) -> Result<UserIdentity, DbError> {
        Ok(UserIdentity {
            id: parse_uuid("user_identity", &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            user_id: parse_uuid("user", &self.user_id)?,
            auth_client_id: parse_uuid("auth_client", &self.auth_client_id)?,
            provider: self.provider,
            subject: self.subject,
            metadata: self.metadata,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the UserIdentity repository.
#[derive(Clone)]
pub struct SurrealUserIdentityRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserIdentityRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserIdentityRepository for SurrealUserIdentityRepository<C> {
    async fn create(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        auth_client_id: Uuid,
        provider: &str,
        subject: &str,
        metadata: serde_json::Value,
    ) -> TesseraResult<UserIdentity> {
        let id_str = Uuid::new_v4().to_string();

        let mut result = self
            .db
            .query(
                "CREATE type::record('user_identity', $id) SET \
                 tenant_id = $tenant_id, user_id = $user_id, \
                 auth_client_id = $auth_client_id, \
                 provider = $provider, subject = $subject, \
                 metadata = $metadata; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('user_identity', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("auth_client_id", auth_client_id.to_string()))
            .bind(("provider", provider.to_string()))
            .bind(("subject", subject.to_string()))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        let rows: Vec<UserIdentityRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_identity".into(),
            id: id_str,
        })?;

        Ok(row.try_into_identity()?)
    }

    async fn list_by_user(&self, tenant_id: Uuid, user_id: Uuid) -> TesseraResult<Vec<UserIdentity>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user_identity \
                 WHERE tenant_id = $tenant_id AND user_id = $user_id \
                 ORDER BY created_at ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserIdentityRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(UserIdentityRow::try_into_identity)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
