//! Tessera Server: Application entry point.
//!
//! Loads layered settings, connects the credential store and wires the
//! credential, password-reset, identity and client services. No transport
//! is mounted; the process holds the wired [`Engine`], drains the reset
//! delivery queue and sweeps the lockout tracker until shutdown.

use std::sync::Arc;

use anyhow::{Context, Result};
use surrealdb::engine::remote::ws::Client;
use tessera_auth::{
    AuthConfig, ClientRegistry, CredentialService, DeliveryWorker, HmacUrlSigner,
    IdentityService, LockoutPolicy, LoginAttemptTracker, PasswordResetService,
    TracingEventRecorder, delivery_queue,
};
use tessera_db::{DbManager, SurrealStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod delivery;

use config::Settings;
use delivery::LogDispatcher;

type Store = SurrealStore<Client>;

/// Interval between lockout-tracker sweeps.
const LOCKOUT_SWEEP_SECS: u64 = 60;

// Service handles are read by transports, none of which are mounted yet.
#[allow(dead_code)]
struct Engine {
    credentials: CredentialService<Store, TracingEventRecorder>,
    resets: PasswordResetService<Store, HmacUrlSigner, TracingEventRecorder>,
    identity: IdentityService<Store>,
    clients: ClientRegistry<Store>,
    lockout: Arc<LoginAttemptTracker>,
}

impl Engine {
    /// Wire the services. The returned worker must be driven for reset
    /// links to leave the process.
    fn new(
        store: Store,
        config: AuthConfig,
    ) -> Result<(Self, DeliveryWorker<LogDispatcher, TracingEventRecorder>)> {
        let store = Arc::new(store);
        let lockout = Arc::new(LoginAttemptTracker::new(LockoutPolicy::from(&config)));
        let signer = HmacUrlSigner::new(&config.url_signing_key)
            .context("reset.url_signing_key must be set")?;
        let (outbox, worker) = delivery_queue(LogDispatcher, TracingEventRecorder, &config);

        let engine = Self {
            credentials: CredentialService::new(
                store.clone(),
                lockout.clone(),
                TracingEventRecorder,
                config.clone(),
            ),
            resets: PasswordResetService::new(
                store.clone(),
                lockout.clone(),
                outbox,
                signer,
                TracingEventRecorder,
                config.clone(),
            ),
            identity: IdentityService::new(store.clone(), &config),
            clients: ClientRegistry::new(store),
            lockout,
        };
        Ok((engine, worker))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tessera=info")),
        )
        .json()
        .init();

    info!("Starting Tessera server v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load().context("Failed to load configuration")?;
    let auth_config = settings.auth_config()?;

    let db = DbManager::connect(&settings.db_config())
        .await
        .context("Failed to connect to the credential store")?;
    let (engine, delivery) = Engine::new(db.store(), auth_config)?;
    tokio::spawn(delivery.run());

    let lockout = engine.lockout.clone();
    let idle = chrono::Duration::seconds(
        (settings.auth.max_lockout_duration_secs as i64).max(LOCKOUT_SWEEP_SECS as i64),
    );
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(LOCKOUT_SWEEP_SECS));
        loop {
            tick.tick().await;
            lockout.cleanup(idle);
        }
    });

    info!("Credential engine ready");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Tessera server stopped.");
    Ok(())
}
