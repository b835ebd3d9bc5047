//! Shared fixtures for repository integration tests.

#![allow(dead_code)]

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tessera_core::models::auth_client::{AuthClient, ClientType, CreateAuthClient};
use tessera_core::models::identity_provider::{CreateIdentityProvider, IdentityProvider};
use tessera_core::models::organization::CreateOrganization;
use tessera_core::models::tenant::{CreateTenant, Tenant};
use tessera_core::models::user::{CreateUser, IdentityBinding, User};
use tessera_core::models::user_identity::DEFAULT_PROVIDER;
use tessera_core::repository::{
    AuthClientRepository, CredentialStore, IdentityProviderRepository, OrganizationRepository,
    TenantRepository, UserRepository,
};
use tessera_db::SurrealStore;

/// Spin up an in-memory DB with the schema applied.
pub async fn setup() -> SurrealStore<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    tessera_db::run_migrations(&db).await.unwrap();
    SurrealStore::new(db)
}

pub struct Fixture {
    pub tenant: Tenant,
    pub provider: IdentityProvider,
    pub client: AuthClient,
}

pub async fn tenant_with_default_client(store: &SurrealStore<Db>, slug: &str) -> Fixture {
    let org = store
        .organizations()
        .create(CreateOrganization {
            name: format!("{slug} org"),
            slug: format!("{slug}-org"),
            metadata: None,
        })
        .await
        .unwrap();
    let tenant = store
        .tenants()
        .create(CreateTenant {
            organization_id: org.id,
            name: slug.into(),
            slug: slug.into(),
            metadata: None,
        })
        .await
        .unwrap();
    let provider = store
        .identity_providers()
        .create(CreateIdentityProvider {
            tenant_id: tenant.id,
            name: "default".into(),
            external_id: format!("{slug}-idp"),
            is_default: true,
        })
        .await
        .unwrap();
    let client = store
        .auth_clients()
        .create(CreateAuthClient {
            identity_provider_id: provider.id,
            tenant_id: tenant.id,
            name: "default".into(),
            display_name: "Default".into(),
            client_type: ClientType::Public,
            domain: Some(format!("https://{slug}.example.com")),
            redirect_uri: None,
            client_id: format!("{slug}-client"),
            client_secret_hash: "00".repeat(32),
            config: None,
            is_active: true,
            is_default: true,
        })
        .await
        .unwrap();

    Fixture {
        tenant,
        provider,
        client,
    }
}

pub async fn user(store: &SurrealStore<Db>, fx: &Fixture, username: &str) -> User {
    store
        .users()
        .create(CreateUser {
            tenant_id: fx.tenant.id,
            organization_id: fx.tenant.organization_id,
            username: username.into(),
            email: Some(format!("{username}@example.com")),
            password_hash: Some("$argon2id$placeholder".into()),
            is_active: true,
            email_verified: false,
            metadata: None,
            identity: Some(IdentityBinding {
                auth_client_id: fx.client.id,
                provider: DEFAULT_PROVIDER.into(),
            }),
        })
        .await
        .unwrap()
}
