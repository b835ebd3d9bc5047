//! SurrealDB implementation of [`AuthClientRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tessera_core::error::TesseraResult;
use tessera_core::models::auth_client::{
    AuthClient, ClientType, CreateAuthClient, UpdateAuthClient,
};
use tessera_core::repository::AuthClientRepository;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

const SELECT_CLIENT: &str = "SELECT meta::id(id) AS record_id, * FROM auth_client";

#[derive(Debug, SurrealValue)]
struct AuthClientRow {
    record_id: String,
    identity_provider_id: String,
    tenant_id: String,
    name: String,
    display_name: String,
    client_type: String,
    domain: Option<String>,
    redirect_uri: Option<String>,
    client_id: String,
    client_secret_hash: String,
    config: serde_json::Value,
    is_active: bool,
    is_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_client_type(s: &str) -> Result<ClientType, DbError> {
    match s {
        "Public" => Ok(ClientType::Public),
        "Confidential" => Ok(ClientType::Confidential),
        "Service" => Ok(ClientType::Service),
        other => Err(DbError::Decode(format!("unknown client type: {other}"))),
    }
}

fn client_type_to_string(t: ClientType) -> &'static str {
    match t {
        ClientType::Public => "Public",
        ClientType::Confidential => "Confidential",
        ClientType::Service => "Service",
    }
}

impl AuthClientRow {
    fn try_into_client(self) -> Result<AuthClient, DbError> {
        Ok(AuthClient {
            id: parse_uuid("auth_client", &self.record_id)?,
            identity_provider_id: parse_uuid("identity_provider", &self.identity_provider_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            name: self.name,
            display_name: self.display_name,
            client_type: parse_client_type(&self.client_type)?,
            domain: self.domain,
            redirect_uri: self.redirect_uri,
            client_id: self.client_id,
            client_secret_hash: self.client_secret_hash,
            config: self.config,
            is_active: self.is_active,
            is_default: self.is_default,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the AuthClient repository.
#[derive(Clone)]
pub struct SurrealAuthClientRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuthClientRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    fn first(rows: Vec<AuthClientRow>) -> Result<Option<AuthClient>, DbError> {
        rows.into_iter()
            .next()
            .map(AuthClientRow::try_into_client)
            .transpose()
    }

    /// Default clients are immutable once created.
    async fn ensure_mutable(&self, id: Uuid) -> TesseraResult<()> {
        let client = self.get_by_id(id).await?;
        if client.is_default {
            return Err(DbError::Conflict(format!("auth client {id} is a default client")).into());
        }
        Ok(())
    }
}

impl<C: Connection> AuthClientRepository for SurrealAuthClientRepository<C> {
    async fn create(&self, input: CreateAuthClient) -> TesseraResult<AuthClient> {
        let id_str = Uuid::new_v4().to_string();
        let config = input
            .config
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let mut result = self
            .db
            .query(
                "CREATE type::record('auth_client', $id) SET \
                 identity_provider_id = $identity_provider_id, \
                 tenant_id = $tenant_id, \
                 name = $name, display_name = $display_name, \
                 client_type = $client_type, \
                 domain = $domain, redirect_uri = $redirect_uri, \
                 client_id = $client_id, \
                 client_secret_hash = $client_secret_hash, \
                 config = $config, \
                 is_active = $is_active, is_default = $is_default; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('auth_client', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind((
                "identity_provider_id",
                input.identity_provider_id.to_string(),
            ))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("display_name", input.display_name))
            .bind((
                "client_type",
                client_type_to_string(input.client_type).to_string(),
            ))
            .bind(("domain", input.domain))
            .bind(("redirect_uri", input.redirect_uri))
            .bind(("client_id", input.client_id))
            .bind(("client_secret_hash", input.client_secret_hash))
            .bind(("config", config))
            .bind(("is_active", input.is_active))
            .bind(("is_default", input.is_default))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        let rows: Vec<AuthClientRow> = result.take(1).map_err(DbError::from)?;
        Ok(Self::first(rows)?.ok_or(DbError::NotFound {
            entity: "auth_client".into(),
            id: id_str,
        })?)
    }

    async fn get_by_id(&self, id: Uuid) -> TesseraResult<AuthClient> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('auth_client', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuthClientRow> = result.take(0).map_err(DbError::from)?;
        Ok(Self::first(rows)?.ok_or(DbError::NotFound {
            entity: "auth_client".into(),
            id: id_str,
        })?)
    }

    async fn find_by_client_id(&self, client_id: &str) -> TesseraResult<Option<AuthClient>> {
        let mut result = self
            .db
            .query(format!("{SELECT_CLIENT} WHERE client_id = $client_id"))
            .bind(("client_id", client_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuthClientRow> = result.take(0).map_err(DbError::from)?;
        Ok(Self::first(rows)?)
    }

    async fn find_by_name(
        &self,
        identity_provider_id: Uuid,
        name: &str,
    ) -> TesseraResult<Option<AuthClient>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_CLIENT} WHERE identity_provider_id = $identity_provider_id \
                 AND name = $name"
            ))
            .bind(("identity_provider_id", identity_provider_id.to_string()))
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuthClientRow> = result.take(0).map_err(DbError::from)?;
        Ok(Self::first(rows)?)
    }

    async fn find_default(&self, identity_provider_id: Uuid) -> TesseraResult<Option<AuthClient>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_CLIENT} WHERE identity_provider_id = $identity_provider_id \
                 AND is_default = true ORDER BY created_at ASC LIMIT 1"
            ))
            .bind(("identity_provider_id", identity_provider_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuthClientRow> = result.take(0).map_err(DbError::from)?;
        Ok(Self::first(rows)?)
    }

    async fn update(&self, id: Uuid, input: UpdateAuthClient) -> TesseraResult<AuthClient> {
        let id_str = id.to_string();
        self.ensure_mutable(id).await?;

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.display_name.is_some() {
            sets.push("display_name = $display_name");
        }
        if input.domain.is_some() {
            sets.push("domain = $domain");
        }
        if input.redirect_uri.is_some() {
            sets.push("redirect_uri = $redirect_uri");
        }
        if input.config.is_some() {
            sets.push("config = $config");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('auth_client', $id) SET {} \
             WHERE is_default = false; \
             SELECT meta::id(id) AS record_id, * \
             FROM type::record('auth_client', $id);",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(display_name) = input.display_name {
            builder = builder.bind(("display_name", display_name));
        }
        if let Some(domain) = input.domain {
            builder = builder.bind(("domain", domain));
        }
        if let Some(redirect_uri) = input.redirect_uri {
            builder = builder.bind(("redirect_uri", redirect_uri));
        }
        if let Some(config) = input.config {
            builder = builder.bind(("config", config));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        let rows: Vec<AuthClientRow> = result.take(1).map_err(DbError::from)?;
        Ok(Self::first(rows)?.ok_or(DbError::NotFound {
            entity: "auth_client".into(),
            id: id_str,
        })?)
    }

    async fn delete(&self, id: Uuid) -> TesseraResult<()> {
        self.ensure_mutable(id).await?;

        self.db
            .query(
                "DELETE type::record('auth_client', $id) \
                 WHERE is_default = false",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }
}
