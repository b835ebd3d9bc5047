//! Integration tests for organization, tenant, identity provider and
//! auth client repositories.

mod common;

use tessera_core::error::TesseraError;
use tessera_core::models::auth_client::UpdateAuthClient;
use tessera_core::models::identity_provider::CreateIdentityProvider;
use tessera_core::repository::{
    AuthClientRepository, CredentialStore, IdentityProviderRepository, TenantRepository,
};
use uuid::Uuid;

#[tokio::test]
async fn tenant_round_trips_through_store() {
    let store = common::setup().await;
    let fx = common::tenant_with_default_client(&store, "acme").await;

    let fetched = store.tenants().get_by_id(fx.tenant.id).await.unwrap();
    assert_eq!(fetched.slug, "acme");
    assert_eq!(fetched.organization_id, fx.tenant.organization_id);
}

#[tokio::test]
async fn missing_tenant_is_not_found() {
    let store = common::setup().await;
    let err = store.tenants().get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn provider_lookup_by_external_id_and_default() {
    let store = common::setup().await;
    let fx = common::tenant_with_default_client(&store, "acme").await;

    let by_ext = store
        .identity_providers()
        .find_by_external_id("acme-idp")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_ext.id, fx.provider.id);

    let default = store
        .identity_providers()
        .find_default(fx.tenant.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(default.id, fx.provider.id);

    assert!(
        store
            .identity_providers()
            .find_by_external_id("nope")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn second_default_provider_conflicts() {
    let store = common::setup().await;
    let fx = common::tenant_with_default_client(&store, "acme").await;

    let err = store
        .identity_providers()
        .create(CreateIdentityProvider {
            tenant_id: fx.tenant.id,
            name: "another".into(),
            external_id: "acme-idp-2".into(),
            is_default: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TesseraError::Conflict { .. }));
}

#[tokio::test]
async fn client_lookups() {
    let store = common::setup().await;
    let fx = common::tenant_with_default_client(&store, "acme").await;
    let clients = store.auth_clients();

    let by_client_id = clients.find_by_client_id("acme-client").await.unwrap().unwrap();
    assert_eq!(by_client_id.id, fx.client.id);
    assert_eq!(by_client_id.tenant_id, fx.tenant.id);

    let by_name = clients
        .find_by_name(fx.provider.id, "default")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_name.id, fx.client.id);

    let default = clients.find_default(fx.provider.id).await.unwrap().unwrap();
    assert!(default.is_default);
}

#[tokio::test]
async fn default_client_cannot_be_updated_or_deleted() {
    let store = common::setup().await;
    let fx = common::tenant_with_default_client(&store, "acme").await;
    let clients = store.auth_clients();

    let err = clients
        .update(
            fx.client.id,
            UpdateAuthClient {
                display_name: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TesseraError::Conflict { .. }));

    let err = clients.delete(fx.client.id).await.unwrap_err();
    assert!(matches!(err, TesseraError::Conflict { .. }));

    let still_there = clients.get_by_id(fx.client.id).await.unwrap();
    assert_eq!(still_there.display_name, "Default");
}
