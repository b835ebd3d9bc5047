//! Auth client registry.

mod common;

use common::{Harness, actor, system_admin};
use tessera_auth::CreateClientRequest;
use tessera_auth::guard::ActorRole;
use tessera_auth::token::hash_token;
use tessera_core::error::{ErrorKind, TesseraError};
use tessera_core::models::auth_client::{ClientType, UpdateAuthClient};
use tessera_core::repository::{AuthClientRepository, CredentialStore};

fn request(fx: &common::TenantFixture, name: &str) -> CreateClientRequest {
    CreateClientRequest {
        identity_provider_id: fx.provider.id,
        name: name.into(),
        display_name: format!("{name} app"),
        client_type: ClientType::Confidential,
        domain: Some("https://api.acme.example.com".into()),
        redirect_uri: Some("https://api.acme.example.com/callback".into()),
        config: None,
        is_default: false,
    }
}

#[tokio::test]
async fn secret_is_returned_once_and_stored_hashed() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;

    let created = h
        .clients()
        .create_client(&system_admin(), request(&acme, "api"))
        .await
        .unwrap();

    assert_eq!(created.client.client_id.len(), 32);
    assert_eq!(created.client.tenant_id, acme.tenant.id);
    assert!(created.client.is_active);
    assert_ne!(created.client.client_secret_hash, created.client_secret);
    assert_eq!(
        created.client.client_secret_hash,
        hash_token(&created.client_secret)
    );

    let stored = h
        .store
        .auth_clients()
        .find_by_client_id(&created.client.client_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, created.client.id);
}

#[tokio::test]
async fn names_are_unique_per_provider() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    let registry = h.clients();

    registry
        .create_client(&system_admin(), request(&acme, "api"))
        .await
        .unwrap();
    let err = registry
        .create_client(&system_admin(), request(&acme, "api"))
        .await
        .unwrap_err();
    assert!(matches!(err, TesseraError::AlreadyExists { .. }));
}

#[tokio::test]
async fn provider_has_one_default_client() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;

    let err = h
        .clients()
        .create_client(
            &system_admin(),
            CreateClientRequest {
                is_default: true,
                ..request(&acme, "second")
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn default_client_is_immutable() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    let registry = h.clients();
    let admin = system_admin();

    let err = registry
        .update_client(
            &admin,
            acme.client.id,
            UpdateAuthClient {
                display_name: Some("renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = registry.delete_client(&admin, acme.client.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let stored = h.store.auth_clients().get_by_id(acme.client.id).await.unwrap();
    assert_eq!(stored.display_name, acme.client.display_name);
}

#[tokio::test]
async fn other_clients_can_be_updated_and_deleted() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    let registry = h.clients();
    let admin = actor(ActorRole::TenantAdmin, &acme);

    let created = registry
        .create_client(&admin, request(&acme, "api"))
        .await
        .unwrap();
    let updated = registry
        .update_client(
            &admin,
            created.client.id,
            UpdateAuthClient {
                display_name: Some("Public API".into()),
                redirect_uri: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.display_name, "Public API");
    assert!(updated.redirect_uri.is_none());
    assert_eq!(updated.name, "api");

    registry.delete_client(&admin, created.client.id).await.unwrap();
    let err = h
        .store
        .auth_clients()
        .get_by_id(created.client.id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn rename_cannot_take_an_existing_name() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    let registry = h.clients();
    let admin = system_admin();

    let api = registry.create_client(&admin, request(&acme, "api")).await.unwrap();
    registry.create_client(&admin, request(&acme, "cli")).await.unwrap();

    let err = registry
        .update_client(
            &admin,
            api.client.id,
            UpdateAuthClient {
                name: Some("cli".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TesseraError::AlreadyExists { .. }));
}

#[tokio::test]
async fn members_cannot_manage_clients() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;

    let err = h
        .clients()
        .create_client(&actor(ActorRole::Member, &acme), request(&acme, "api"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}
