//! SurrealDB implementation of [`RoleRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tessera_core::error::TesseraResult;
use tessera_core::models::role::{CreateRole, Role};
use tessera_core::repository::RoleRepository;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct RoleRow {
    record_id: String,
    tenant_id: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    fn try_into_role(self) -> Result<Role, DbError> {
        Ok(Role {
            id: parse_uuid("role", &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn edge_count(&self, user_id: &str, role_id: &str) -> Result<u64, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM has_role \
                 WHERE in = type::record('user', $user_id) \
                 AND out = type::record('role', $role_id) GROUP ALL",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await?;

        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> TesseraResult<Role> {
        let id_str = Uuid::new_v4().to_string();

        let mut result = self
            .db
            .query(
                "CREATE type::record('role', $id) SET \
                 tenant_id = $tenant_id, \
                 name = $name, description = $description; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('role', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(row.try_into_role()?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> TesseraResult<Role> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('role', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(row.try_into_role()?)
    }

    async fn assign_to_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> TesseraResult<bool> {
        // Both ends must live in the caller's tenant.
        self.get_by_id(tenant_id, role_id).await?;

        let user_id_str = user_id.to_string();
        let role_id_str = role_id.to_string();

        if self.edge_count(&user_id_str, &role_id_str).await? > 0 {
            return Ok(false);
        }

        let query = format!("RELATE user:`{user_id_str}` -> has_role -> role:`{role_id_str}`;");

        let related = self
            .db
            .query(&query)
            .await
            .and_then(|response| response.check());

        let Err(e) = related else {
            return Ok(true);
        };
        // A concurrent assignment won the unique (in, out) index or the
        // transaction; the edge it wrote is the one we wanted.
        if self.edge_count(&user_id_str, &role_id_str).await? > 0 {
            debug!(
                user_id = %user_id_str,
                role_id = %role_id_str,
                error = %e,
                "Role already assigned by a concurrent request"
            );
            return Ok(false);
        }
        Err(DbError::from(e).into())
    }

    async fn unassign_from_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> TesseraResult<bool> {
        self.get_by_id(tenant_id, role_id).await?;

        let user_id_str = user_id.to_string();
        let role_id_str = role_id.to_string();

        if self.edge_count(&user_id_str, &role_id_str).await? == 0 {
            return Ok(false);
        }

        self.db
            .query(
                "DELETE has_role WHERE \
                 in = type::record('user', $user_id) AND \
                 out = type::record('role', $role_id)",
            )
            .bind(("user_id", user_id_str))
            .bind(("role_id", role_id_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(true)
    }

    async fn get_user_roles(&self, tenant_id: Uuid, user_id: Uuid) -> TesseraResult<Vec<Role>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE tenant_id = $tenant_id AND id IN (\
                     SELECT VALUE out FROM has_role \
                     WHERE in = type::record('user', $user_id)\
                 ) ORDER BY name ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(RoleRow::try_into_role)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
