//! SurrealDB implementation of [`IdentityProviderRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tessera_core::error::TesseraResult;
use tessera_core::models::identity_provider::{CreateIdentityProvider, IdentityProvider};
use tessera_core::repository::IdentityProviderRepository;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct IdentityProviderRow {
    record_id: String,
    tenant_id: String,
    name: String,
    external_id: String,
    is_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IdentityProviderRow {
    fn try_into_provider(self) -> Result<IdentityProvider, DbError> {
        Ok(IdentityProvider {
            id: parse_uuid("identity_provider", &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            name: self.name,
            external_id: self.external_id,
            is_default: self.is_default,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the IdentityProvider repository.
#[derive(Clone)]
pub struct SurrealIdentityProviderRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealIdentityProviderRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn select_one(
        &self,
        query: &str,
        key: &'static str,
        value: String,
    ) -> Result<Option<IdentityProvider>, DbError> {
        let mut result = self.db.query(query).bind((key, value)).await?;
        let rows: Vec<IdentityProviderRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(IdentityProviderRow::try_into_provider)
            .transpose()
    }
}

impl<C: Connection> IdentityProviderRepository for SurrealIdentityProviderRepository<C> {
    async fn create(&self, input: CreateIdentityProvider) -> TesseraResult<IdentityProvider> {
        if input.is_default && self.find_default(input.tenant_id).await?.is_some() {
            return Err(DbError::Conflict(format!(
                "tenant {} already has a default identity provider",
                input.tenant_id
            ))
            .into());
        }

        let id_str = Uuid::new_v4().to_string();

        let mut result = self
            .db
            .query(
                "CREATE type::record('identity_provider', $id) SET \
                 tenant_id = $tenant_id, name = $name, \
                 external_id = $external_id, is_default = $is_default; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('identity_provider', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("external_id", input.external_id))
            .bind(("is_default", input.is_default))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        let rows: Vec<IdentityProviderRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "identity_provider".into(),
            id: id_str,
        })?;

        Ok(row.try_into_provider()?)
    }

    async fn get_by_id(&self, id: Uuid) -> TesseraResult<IdentityProvider> {
        self.select_one(
            "SELECT meta::id(id) AS record_id, * \
             FROM type::record('identity_provider', $id)",
            "id",
            id.to_string(),
        )
        .await?
        .ok_or_else(|| {
            DbError::NotFound {
                entity: "identity_provider".into(),
                id: id.to_string(),
            }
            .into()
        })
    }

    async fn find_by_external_id(&self, external_id: &str) -> TesseraResult<Option<IdentityProvider>> {
        Ok(self
            .select_one(
                "SELECT meta::id(id) AS record_id, * FROM identity_provider \
                 WHERE external_id = $external_id",
                "external_id",
                external_id.to_string(),
            )
            .await?)
    }

    async fn find_default(&self, tenant_id: Uuid) -> TesseraResult<Option<IdentityProvider>> {
        Ok(self
            .select_one(
                "SELECT meta::id(id) AS record_id, * FROM identity_provider \
                 WHERE tenant_id = $tenant_id AND is_default = true \
                 ORDER BY created_at ASC LIMIT 1",
                "tenant_id",
                tenant_id.to_string(),
            )
            .await?)
    }
}
