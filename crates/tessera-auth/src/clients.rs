//! Auth client registry.
//!
//! Default clients are created with their identity provider and are
//! immutable afterwards.

use std::sync::Arc;

use serde::Deserialize;
use tessera_core::error::{TesseraError, TesseraResult};
use tessera_core::models::auth_client::{AuthClient, ClientType, CreateAuthClient, UpdateAuthClient};
use tessera_core::repository::{AuthClientRepository, CredentialStore, IdentityProviderRepository};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::guard::{Access, Actor, TenantAccessGuard};
use crate::token;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateClientRequest {
    pub identity_provider_id: Uuid,
    pub name: String,
    pub display_name: String,
    pub client_type: ClientType,
    pub domain: Option<String>,
    pub redirect_uri: Option<String>,
    pub config: Option<serde_json::Value>,
    pub is_default: bool,
}

/// A freshly created client and its secret. The secret is not stored
/// and cannot be retrieved again.
#[derive(Debug, Clone)]
pub struct CreatedClient {
    pub client: AuthClient,
    pub client_secret: String,
}

pub struct ClientRegistry<S: CredentialStore> {
    store: Arc<S>,
    guard: TenantAccessGuard<S>,
}

impl<S: CredentialStore> ClientRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            guard: TenantAccessGuard::new(store.clone()),
            store,
        }
    }

    #[instrument(skip_all, fields(actor_id = %actor.user_id, idp_id = %input.identity_provider_id))]
    pub async fn create_client(
        &self,
        actor: &Actor,
        input: CreateClientRequest,
    ) -> TesseraResult<CreatedClient> {
        let provider = self
            .store
            .identity_providers()
            .get_by_id(input.identity_provider_id)
            .await?;
        self.guard
            .authorize(actor, provider.tenant_id, Access::Write)
            .await?;

        let clients = self.store.auth_clients();
        if clients.find_by_name(provider.id, &input.name).await?.is_some() {
            return Err(TesseraError::already_exists("auth client", "name"));
        }
        if input.is_default && clients.find_default(provider.id).await?.is_some() {
            return Err(TesseraError::Conflict {
                reason: format!("identity provider {} already has a default client", provider.id),
            });
        }

        let client_secret = token::generate_client_secret();
        let client = clients
            .create(CreateAuthClient {
                identity_provider_id: provider.id,
                tenant_id: provider.tenant_id,
                name: input.name,
                display_name: input.display_name,
                client_type: input.client_type,
                domain: input.domain,
                redirect_uri: input.redirect_uri,
                client_id: Uuid::new_v4().simple().to_string(),
                client_secret_hash: token::hash_token(&client_secret),
                config: input.config,
                is_active: true,
                is_default: input.is_default,
            })
            .await?;

        info!(client_id = %client.client_id, "Auth client created");
        Ok(CreatedClient {
            client,
            client_secret,
        })
    }

    #[instrument(skip_all, fields(actor_id = %actor.user_id, %id))]
    pub async fn update_client(
        &self,
        actor: &Actor,
        id: Uuid,
        input: UpdateAuthClient,
    ) -> TesseraResult<AuthClient> {
        let current = self.mutable_client(actor, id).await?;

        if let Some(name) = input.name.as_deref() {
            if name != current.name
                && self
                    .store
                    .auth_clients()
                    .find_by_name(current.identity_provider_id, name)
                    .await?
                    .is_some()
            {
                return Err(TesseraError::already_exists("auth client", "name"));
            }
        }

        let client = self.store.auth_clients().update(id, input).await?;
        info!(client_id = %client.client_id, "Auth client updated");
        Ok(client)
    }

    #[instrument(skip_all, fields(actor_id = %actor.user_id, %id))]
    pub async fn delete_client(&self, actor: &Actor, id: Uuid) -> TesseraResult<()> {
        let client = self.mutable_client(actor, id).await?;
        self.store.auth_clients().delete(id).await?;
        info!(client_id = %client.client_id, "Auth client deleted");
        Ok(())
    }

    async fn mutable_client(&self, actor: &Actor, id: Uuid) -> TesseraResult<AuthClient> {
        let client = self.store.auth_clients().get_by_id(id).await?;
        self.guard
            .authorize(actor, client.tenant_id, Access::Write)
            .await?;
        if client.is_default {
            return Err(TesseraError::Conflict {
                reason: format!("auth client {} is a default client", client.client_id),
            });
        }
        Ok(client)
    }
}
