//! Auth client resolution.
//!
//! Maps an optional `client_id` and an optional identity provider
//! external id onto a fully loaded client, provider and tenant.

use std::sync::Arc;

use tessera_core::error::{TesseraError, TesseraResult};
use tessera_core::models::auth_client::AuthClient;
use tessera_core::models::identity_provider::IdentityProvider;
use tessera_core::models::tenant::Tenant;
use tessera_core::repository::{
    AuthClientRepository, CredentialStore, IdentityProviderRepository, TenantRepository,
};
use tracing::{debug, warn};
use uuid::Uuid;

/// A client that may mint tokens, with its ancestry.
#[derive(Debug, Clone)]
pub struct ResolvedClient {
    pub client: AuthClient,
    pub identity_provider: IdentityProvider,
    pub tenant: Tenant,
    /// The client's domain, used as token issuer.
    pub issuer: String,
}

impl ResolvedClient {
    pub fn tenant_id(&self) -> Uuid {
        self.tenant.id
    }

    pub fn organization_id(&self) -> Uuid {
        self.tenant.organization_id
    }
}

pub struct ClientResolver<S: CredentialStore> {
    store: Arc<S>,
    system_tenant_id: Option<Uuid>,
}

impl<S: CredentialStore> ClientResolver<S> {
    pub fn new(store: Arc<S>, system_tenant_id: Option<Uuid>) -> Self {
        Self {
            store,
            system_tenant_id,
        }
    }

    /// Resolve a request's auth client.
    ///
    /// Every miss, inactive client or client without an issuer domain
    /// is reported as the same `NotFound`; the cause is only logged.
    pub async fn resolve(
        &self,
        client_id: Option<&str>,
        identity_provider_id: Option<&str>,
    ) -> TesseraResult<ResolvedClient> {
        match self.lookup(client_id, identity_provider_id).await {
            Ok(resolved) => {
                debug!(
                    client_id = %resolved.client.client_id,
                    tenant_id = %resolved.tenant.id,
                    "Resolved auth client"
                );
                Ok(resolved)
            }
            Err(e) if e.is_not_found() => {
                warn!(
                    client_id = client_id.unwrap_or("-"),
                    identity_provider_id = identity_provider_id.unwrap_or("-"),
                    cause = %e,
                    "Auth client resolution failed"
                );
                Err(TesseraError::not_found(
                    "auth client",
                    client_id.unwrap_or("default"),
                ))
            }
            Err(e) => Err(e),
        }
    }

    async fn lookup(
        &self,
        client_id: Option<&str>,
        identity_provider_id: Option<&str>,
    ) -> TesseraResult<ResolvedClient> {
        let (client, provider) = match (client_id, identity_provider_id) {
            (Some(cid), Some(ext)) => {
                let provider = self.provider_by_external_id(ext).await?;
                let client = self.client_by_client_id(cid).await?;
                if client.identity_provider_id != provider.id {
                    return Err(TesseraError::not_found(
                        "auth client under identity provider",
                        format!("{cid}@{ext}"),
                    ));
                }
                (client, provider)
            }
            (Some(cid), None) => {
                let client = self.client_by_client_id(cid).await?;
                let provider = self
                    .store
                    .identity_providers()
                    .get_by_id(client.identity_provider_id)
                    .await?;
                (client, provider)
            }
            (None, Some(ext)) => {
                let provider = self.provider_by_external_id(ext).await?;
                let client = self.default_client(&provider).await?;
                (client, provider)
            }
            (None, None) => {
                let tenant_id = self.system_tenant_id.ok_or_else(|| {
                    TesseraError::not_found("system tenant", "unconfigured")
                })?;
                let provider = self
                    .store
                    .identity_providers()
                    .find_default(tenant_id)
                    .await?
                    .ok_or_else(|| TesseraError::not_found("default identity provider", tenant_id))?;
                let client = self.default_client(&provider).await?;
                (client, provider)
            }
        };

        if !client.is_active {
            return Err(TesseraError::not_found(
                "active auth client",
                &client.client_id,
            ));
        }
        let issuer = match client.domain.as_deref().map(str::trim) {
            Some(domain) if !domain.is_empty() => domain.to_string(),
            _ => {
                return Err(TesseraError::not_found(
                    "auth client with issuer domain",
                    &client.client_id,
                ));
            }
        };
        if client.tenant_id != provider.tenant_id {
            return Err(TesseraError::not_found(
                "auth client in provider tenant",
                &client.client_id,
            ));
        }

        let tenant = self.store.tenants().get_by_id(provider.tenant_id).await?;

        Ok(ResolvedClient {
            client,
            identity_provider: provider,
            tenant,
            issuer,
        })
    }

    /// Default client of the tenant's default provider, without activity
    /// checks.
    pub async fn default_client_for_tenant(
        &self,
        tenant_id: Uuid,
    ) -> TesseraResult<Option<AuthClient>> {
        let Some(provider) = self
            .store
            .identity_providers()
            .find_default(tenant_id)
            .await?
        else {
            return Ok(None);
        };
        self.store.auth_clients().find_default(provider.id).await
    }

    async fn provider_by_external_id(&self, external_id: &str) -> TesseraResult<IdentityProvider> {
        self.store
            .identity_providers()
            .find_by_external_id(external_id)
            .await?
            .ok_or_else(|| TesseraError::not_found("identity provider", external_id))
    }

    async fn client_by_client_id(&self, client_id: &str) -> TesseraResult<AuthClient> {
        self.store
            .auth_clients()
            .find_by_client_id(client_id)
            .await?
            .ok_or_else(|| TesseraError::not_found("auth client", client_id))
    }

    async fn default_client(&self, provider: &IdentityProvider) -> TesseraResult<AuthClient> {
        self.store
            .auth_clients()
            .find_default(provider.id)
            .await?
            .ok_or_else(|| TesseraError::not_found("default auth client", provider.id))
    }
}
