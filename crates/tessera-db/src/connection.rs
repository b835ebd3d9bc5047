//! SurrealDB connection management.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::repository::SurrealStore;
use crate::schema::run_migrations;

/// Connection settings for the credential store.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket endpoint (e.g., `127.0.0.1:8000`).
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials used for sign-in.
    pub username: String,
    pub password: String,
    /// Apply pending schema migrations right after connecting.
    pub migrate_on_connect: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:8000".into(),
            namespace: "tessera".into(),
            database: "credentials".into(),
            username: "root".into(),
            password: "root".into(),
            migrate_on_connect: true,
        }
    }
}

/// Owns the SurrealDB client and hands out repository bundles over it.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect, sign in as root, select namespace and database, and
    /// optionally bring the schema up to date.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            endpoint = %config.endpoint,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to credential store"
        );

        let db = Surreal::new::<Ws>(config.endpoint.as_str()).await?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        if config.migrate_on_connect {
            run_migrations(&db).await?;
        }

        info!("Credential store ready");

        Ok(Self { db })
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }

    /// Repository bundle sharing this connection.
    pub fn store(&self) -> SurrealStore<Client> {
        SurrealStore::new(self.db.clone())
    }
}
