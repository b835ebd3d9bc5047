//! SurrealDB implementation of [`TenantMemberRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tessera_core::error::TesseraResult;
use tessera_core::models::tenant_member::{MemberRole, TenantMember};
use tessera_core::repository::TenantMemberRepository;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct TenantMemberRow {
    record_id: String,
    tenant_id: String,
    user_id: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TenantMemberRow {
    fn try_into_member(self) -> Result<TenantMember, DbError> {
        let role = MemberRole::parse(&self.role)
            .ok_or_else(|| DbError::Decode(format!("unknown member role: {}", self.role)))?;
        Ok(TenantMember {
            id: parse_uuid("tenant_member", &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            user_id: parse_uuid("user", &self.user_id)?,
            role,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the TenantMember repository.
#[derive(Clone)]
pub struct SurrealTenantMemberRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantMemberRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TenantMemberRepository for SurrealTenantMemberRepository<C> {
    async fn upsert(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> TesseraResult<TenantMember> {
        let tenant_id_str = tenant_id.to_string();
        let user_id_str = user_id.to_string();

        match self.find(tenant_id, user_id).await? {
            Some(existing) => {
                self.db
                    .query(
                        "UPDATE type::record('tenant_member', $id) SET role = $role",
                    )
                    .bind(("id", existing.id.to_string()))
                    .bind(("role", role.as_str().to_string()))
                    .await
                    .map_err(DbError::from)?
                    .check()
                    .map_err(DbError::from)?;
            }
            None => {
                self.db
                    .query(
                        "CREATE type::record('tenant_member', $id) SET \
                         tenant_id = $tenant_id, user_id = $user_id, role = $role",
                    )
                    .bind(("id", Uuid::new_v4().to_string()))
                    .bind(("tenant_id", tenant_id_str.clone()))
                    .bind(("user_id", user_id_str.clone()))
                    .bind(("role", role.as_str().to_string()))
                    .await
                    .map_err(DbError::from)?
                    .check()
                    .map_err(DbError::from)?;
            }
        }

        self.find(tenant_id, user_id).await?.ok_or_else(|| {
            DbError::NotFound {
                entity: "tenant_member".into(),
                id: format!("{tenant_id_str}/{user_id_str}"),
            }
            .into()
        })
    }

    async fn find(&self, tenant_id: Uuid, user_id: Uuid) -> TesseraResult<Option<TenantMember>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM tenant_member \
                 WHERE tenant_id = $tenant_id AND user_id = $user_id LIMIT 1",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantMemberRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(TenantMemberRow::try_into_member)
            .transpose()?)
    }

    async fn remove(&self, tenant_id: Uuid, user_id: Uuid) -> TesseraResult<bool> {
        let Some(existing) = self.find(tenant_id, user_id).await? else {
            return Ok(false);
        };

        self.db
            .query("DELETE type::record('tenant_member', $id)")
            .bind(("id", existing.id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(true)
    }
}
