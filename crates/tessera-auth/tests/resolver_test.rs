//! Client resolution across the four lookup modes.

mod common;

use common::Harness;
use tessera_auth::ClientResolver;
use tessera_auth::clients::CreateClientRequest;
use tessera_core::error::TesseraError;
use tessera_core::models::auth_client::{ClientType, UpdateAuthClient};

fn extra_client(fx: &common::TenantFixture, name: &str, domain: Option<&str>) -> CreateClientRequest {
    CreateClientRequest {
        identity_provider_id: fx.provider.id,
        name: name.into(),
        display_name: name.into(),
        client_type: ClientType::Confidential,
        domain: domain.map(str::to_string),
        redirect_uri: None,
        config: None,
        is_default: false,
    }
}

fn assert_opaque_not_found(err: TesseraError) {
    match err {
        TesseraError::NotFound { entity, .. } => assert_eq!(entity, "auth client"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn resolves_by_client_id() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    let resolver = ClientResolver::new(h.store.clone(), None);

    let resolved = resolver.resolve(Some("acme-web"), None).await.unwrap();
    assert_eq!(resolved.client.id, acme.client.id);
    assert_eq!(resolved.identity_provider.id, acme.provider.id);
    assert_eq!(resolved.tenant.id, acme.tenant.id);
    assert_eq!(resolved.issuer, "https://acme.example.com");
}

#[tokio::test]
async fn provider_alone_resolves_its_default_client() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    let resolver = ClientResolver::new(h.store.clone(), None);

    let resolved = resolver.resolve(None, Some("acme-idp")).await.unwrap();
    assert_eq!(resolved.client.id, acme.client.id);
}

#[tokio::test]
async fn client_must_belong_to_named_provider() {
    let h = Harness::new().await;
    h.tenant("acme").await;
    h.tenant("globex").await;
    let resolver = ClientResolver::new(h.store.clone(), None);

    assert!(resolver.resolve(Some("acme-web"), Some("acme-idp")).await.is_ok());
    let err = resolver
        .resolve(Some("acme-web"), Some("globex-idp"))
        .await
        .unwrap_err();
    assert_opaque_not_found(err);
}

#[tokio::test]
async fn system_default_needs_configured_tenant() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;

    let unconfigured = ClientResolver::new(h.store.clone(), None);
    assert_opaque_not_found(unconfigured.resolve(None, None).await.unwrap_err());

    let configured = ClientResolver::new(h.store.clone(), Some(acme.tenant.id));
    let resolved = configured.resolve(None, None).await.unwrap();
    assert_eq!(resolved.client.id, acme.client.id);
}

#[tokio::test]
async fn inactive_and_domainless_clients_do_not_resolve() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    let registry = h.clients();
    let admin = common::system_admin();

    let no_domain = registry
        .create_client(&admin, extra_client(&acme, "cli", None))
        .await
        .unwrap();
    let inactive = registry
        .create_client(&admin, extra_client(&acme, "old", Some("https://old.example.com")))
        .await
        .unwrap();
    registry
        .update_client(
            &admin,
            inactive.client.id,
            UpdateAuthClient {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let resolver = ClientResolver::new(h.store.clone(), None);
    assert_opaque_not_found(
        resolver
            .resolve(Some(no_domain.client.client_id.as_str()), None)
            .await
            .unwrap_err(),
    );
    assert_opaque_not_found(
        resolver
            .resolve(Some(inactive.client.client_id.as_str()), None)
            .await
            .unwrap_err(),
    );
}

#[tokio::test]
async fn default_client_for_tenant_skips_activity_checks() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    let resolver = ClientResolver::new(h.store.clone(), None);

    let client = resolver
        .default_client_for_tenant(acme.tenant.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(client.id, acme.client.id);
    assert!(
        resolver
            .default_client_for_tenant(uuid::Uuid::new_v4())
            .await
            .unwrap()
            .is_none()
    );
}
