//! Server configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use tessera_auth::AuthConfig;
use tessera_db::DbConfig;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub reset: ResetSettings,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_true")]
    pub migrate_on_connect: bool,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    /// Path to the PEM-encoded Ed25519 private key.
    pub jwt_private_key_path: String,
    /// Path to the PEM-encoded Ed25519 public key.
    pub jwt_public_key_path: String,
    pub refresh_signing_secret: String,
    pub access_token_lifetime_secs: u64,
    pub refresh_token_lifetime_secs: u64,
    #[serde(default)]
    pub pepper: Option<String>,
    pub min_password_length: usize,
    pub max_failed_login_attempts: u32,
    pub lockout_duration_secs: u64,
    pub lockout_backoff_multiplier: f64,
    pub max_lockout_duration_secs: u64,
    #[serde(default)]
    pub system_tenant_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ResetSettings {
    pub token_lifetime_secs: u64,
    pub link_base_url: String,
    pub link_ttl_secs: u64,
    pub url_signing_key: String,
    pub delivery_timeout_secs: u64,
    pub delivery_queue_capacity: usize,
}

fn default_true() -> bool {
    true
}

impl Settings {
    pub fn load() -> Result<Self> {
        let db = DbConfig::default();
        let auth = AuthConfig::default();

        let config = config::Config::builder()
            .set_default("database.endpoint", db.endpoint)?
            .set_default("database.namespace", db.namespace)?
            .set_default("database.database", db.database)?
            .set_default("database.username", db.username)?
            .set_default("database.password", db.password)?
            .set_default("database.migrate_on_connect", db.migrate_on_connect)?
            .set_default("auth.jwt_private_key_path", "keys/jwt_ed25519.pem")?
            .set_default("auth.jwt_public_key_path", "keys/jwt_ed25519.pub.pem")?
            .set_default("auth.refresh_signing_secret", "")?
            .set_default("auth.access_token_lifetime_secs", auth.access_token_lifetime_secs)?
            .set_default("auth.refresh_token_lifetime_secs", auth.refresh_token_lifetime_secs)?
            .set_default("auth.min_password_length", auth.min_password_length as u64)?
            .set_default("auth.max_failed_login_attempts", auth.max_failed_login_attempts)?
            .set_default("auth.lockout_duration_secs", auth.lockout_duration_secs)?
            .set_default("auth.lockout_backoff_multiplier", auth.lockout_backoff_multiplier)?
            .set_default("auth.max_lockout_duration_secs", auth.max_lockout_duration_secs)?
            .set_default("reset.token_lifetime_secs", auth.password_reset_token_lifetime_secs)?
            .set_default("reset.link_base_url", auth.reset_link_base_url)?
            .set_default("reset.link_ttl_secs", auth.reset_link_ttl_secs)?
            .set_default("reset.url_signing_key", "")?
            .set_default("reset.delivery_timeout_secs", auth.delivery_timeout_secs)?
            .set_default("reset.delivery_queue_capacity", auth.delivery_queue_capacity as u64)?
            // Load from config file if present
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // TESSERA__AUTH__PEPPER=... overrides auth.pepper
            .add_source(
                config::Environment::with_prefix("TESSERA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn db_config(&self) -> DbConfig {
        let db = &self.database;
        DbConfig {
            endpoint: db.endpoint.clone(),
            namespace: db.namespace.clone(),
            database: db.database.clone(),
            username: db.username.clone(),
            password: db.password.clone(),
            migrate_on_connect: db.migrate_on_connect,
        }
    }

    /// Build the engine configuration, reading the signing keys from disk.
    pub fn auth_config(&self) -> Result<AuthConfig> {
        let jwt_private_key_pem = std::fs::read_to_string(&self.auth.jwt_private_key_path)
            .with_context(|| format!("reading {}", self.auth.jwt_private_key_path))?;
        let jwt_public_key_pem = std::fs::read_to_string(&self.auth.jwt_public_key_path)
            .with_context(|| format!("reading {}", self.auth.jwt_public_key_path))?;
        Ok(self.auth_config_with_keys(jwt_private_key_pem, jwt_public_key_pem))
    }

    fn auth_config_with_keys(&self, private_pem: String, public_pem: String) -> AuthConfig {
        let auth = &self.auth;
        let reset = &self.reset;
        AuthConfig {
            jwt_private_key_pem: private_pem,
            jwt_public_key_pem: public_pem,
            refresh_signing_secret: auth.refresh_signing_secret.clone(),
            access_token_lifetime_secs: auth.access_token_lifetime_secs,
            refresh_token_lifetime_secs: auth.refresh_token_lifetime_secs,
            pepper: auth.pepper.clone().filter(|p| !p.is_empty()),
            min_password_length: auth.min_password_length,
            max_failed_login_attempts: auth.max_failed_login_attempts,
            lockout_duration_secs: auth.lockout_duration_secs,
            lockout_backoff_multiplier: auth.lockout_backoff_multiplier,
            max_lockout_duration_secs: auth.max_lockout_duration_secs,
            password_reset_token_lifetime_secs: reset.token_lifetime_secs,
            reset_link_base_url: reset.link_base_url.clone(),
            reset_link_ttl_secs: reset.link_ttl_secs,
            url_signing_key: reset.url_signing_key.clone(),
            delivery_timeout_secs: reset.delivery_timeout_secs,
            delivery_queue_capacity: reset.delivery_queue_capacity,
            system_tenant_id: auth.system_tenant_id,
        }
    }
}
