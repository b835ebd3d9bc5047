//! SurrealDB implementation of [`UserRepository`].
//!
//! Password hashes arrive pre-computed; this layer never sees
//! plaintext credentials.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tessera_core::error::TesseraResult;
use tessera_core::models::user::{CreateUser, UpdateUser, User};
use tessera_core::repository::UserRepository;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    tenant_id: String,
    organization_id: String,
    username: String,
    email: Option<String>,
    password_hash: Option<String>,
    is_active: bool,
    email_verified: bool,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid("user", &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            organization_id: parse_uuid("organization", &self.organization_id)?,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            is_active: self.is_active,
            email_verified: self.email_verified,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_by(
        &self,
        tenant_id: Uuid,
        field: &'static str,
        value: &str,
    ) -> Result<Option<User>, DbError> {
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM user \
             WHERE tenant_id = $tenant_id AND {field} = $value LIMIT 1"
        );

        let mut result = self
            .db
            .query(query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("value", value.to_string()))
            .await?;

        let rows: Vec<UserRow> = result.take(0)?;
        rows.into_iter().next().map(UserRow::try_into_user).transpose()
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> TesseraResult<User> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let tenant_id_str = input.tenant_id.to_string();

        let metadata = input
            .metadata
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let identity_stmt = if input.identity.is_some() {
            "CREATE type::record('user_identity', $identity_id) SET \
             tenant_id = $tenant_id, user_id = $id, \
             auth_client_id = $auth_client_id, \
             provider = $provider, subject = $id, metadata = {};"
        } else {
            ""
        };

        let query = format!(
            "BEGIN TRANSACTION; \
             CREATE type::record('user', $id) SET \
             tenant_id = $tenant_id, \
             organization_id = $organization_id, \
             username = $username, email = $email, \
             password_hash = $password_hash, \
             is_active = $is_active, \
             email_verified = $email_verified, \
             metadata = $metadata; \
             {identity_stmt} \
             COMMIT TRANSACTION;"
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id_str))
            .bind(("organization_id", input.organization_id.to_string()))
            .bind(("username", input.username))
            .bind(("email", input.email))
            .bind(("password_hash", input.password_hash))
            .bind(("is_active", input.is_active))
            .bind(("email_verified", input.email_verified))
            .bind(("metadata", metadata));

        if let Some(identity) = input.identity {
            builder = builder
                .bind(("identity_id", Uuid::new_v4().to_string()))
                .bind(("auth_client_id", identity.auth_client_id.to_string()))
                .bind(("provider", identity.provider));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        self.get_by_id(input.tenant_id, id).await
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> TesseraResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM type::record('user', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.try_into_user()?)
    }

    async fn find_by_username(&self, tenant_id: Uuid, username: &str) -> TesseraResult<Option<User>> {
        Ok(self.find_by(tenant_id, "username", username).await?)
    }

    async fn find_by_email(&self, tenant_id: Uuid, email: &str) -> TesseraResult<Option<User>> {
        Ok(self.find_by(tenant_id, "email", email).await?)
    }

    async fn update(&self, tenant_id: Uuid, id: Uuid, input: UpdateUser) -> TesseraResult<User> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.username.is_some() {
            sets.push("username = $username");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.password_hash.is_some() {
            sets.push("password_hash = $password_hash");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        if input.email_verified.is_some() {
            sets.push("email_verified = $email_verified");
        }
        if input.metadata.is_some() {
            sets.push("metadata = $metadata");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {} \
             WHERE tenant_id = $tenant_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str))
            .bind(("tenant_id", tenant_id.to_string()));

        if let Some(username) = input.username {
            builder = builder.bind(("username", username));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(password_hash) = input.password_hash {
            builder = builder.bind(("password_hash", Some(password_hash)));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        if let Some(email_verified) = input.email_verified {
            builder = builder.bind(("email_verified", email_verified));
        }
        if let Some(metadata) = input.metadata {
            builder = builder.bind(("metadata", metadata));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        self.get_by_id(tenant_id, id).await
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> TesseraResult<()> {
        let id_str = id.to_string();

        self.db
            .query(format!(
                "BEGIN TRANSACTION; \
                 DELETE user_identity WHERE tenant_id = $tenant_id AND user_id = $id; \
                 DELETE user_token WHERE tenant_id = $tenant_id AND user_id = $id; \
                 DELETE tenant_member WHERE user_id = $id; \
                 DELETE has_role WHERE in = user:`{id_str}`; \
                 DELETE type::record('user', $id) WHERE tenant_id = $tenant_id; \
                 COMMIT TRANSACTION;"
            ))
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }
}
