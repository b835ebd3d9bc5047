//! User, role and membership mutations.
//!
//! Every operation authorizes the actor against the target's tenant
//! before it reads or writes anything.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tessera_core::error::{TesseraError, TesseraResult};
use tessera_core::models::auth_client::AuthClient;
use tessera_core::models::role::Role;
use tessera_core::models::tenant::Tenant;
use tessera_core::models::tenant_member::{MemberRole, TenantMember};
use tessera_core::models::user::{CreateUser, IdentityBinding, UpdateUser, User};
use tessera_core::models::user_identity::{DEFAULT_PROVIDER, UserIdentity};
use tessera_core::repository::{
    AuthClientRepository, CredentialStore, RoleRepository, TenantMemberRepository,
    UserIdentityRepository, UserRepository,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::guard::{Access, Actor, TenantAccessGuard};
use crate::password::{self, PasswordPolicy};
use crate::resolver::ClientResolver;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub tenant_id: Uuid,
    pub username: String,
    pub email: Option<String>,
    /// Plaintext; checked against the policy and hashed before storage.
    pub password: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub email: Option<Option<String>>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub email_verified: Option<bool>,
    pub metadata: Option<serde_json::Value>,
}

/// Which nested records [`IdentityService::get_user`] loads.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UserInclude {
    pub identities: bool,
    pub roles: bool,
    pub tenant: bool,
    pub auth_client: bool,
}

impl UserInclude {
    pub fn all() -> Self {
        Self {
            identities: true,
            roles: true,
            tenant: true,
            auth_client: true,
        }
    }
}

/// A user with optionally loaded relations. A `None` field was not
/// requested; it does not mean the relation is empty.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identities: Option<Vec<UserIdentity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<Tenant>,
    /// The client bound through the user's default identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_client: Option<AuthClient>,
}

pub struct IdentityService<S: CredentialStore> {
    store: Arc<S>,
    guard: TenantAccessGuard<S>,
    resolver: ClientResolver<S>,
    policy: PasswordPolicy,
    pepper: Option<String>,
}

impl<S: CredentialStore> IdentityService<S> {
    pub fn new(store: Arc<S>, config: &AuthConfig) -> Self {
        Self {
            guard: TenantAccessGuard::new(store.clone()),
            resolver: ClientResolver::new(store.clone(), config.system_tenant_id),
            store,
            policy: PasswordPolicy::new(config.min_password_length),
            pepper: config.pepper.clone(),
        }
    }

    fn hash(&self, password: &str) -> TesseraResult<String> {
        self.policy.validate(password)?;
        Ok(password::hash_password(password, self.pepper.as_deref())?)
    }

    async fn ensure_unique(
        &self,
        tenant_id: Uuid,
        username: Option<&str>,
        email: Option<&str>,
    ) -> TesseraResult<()> {
        let users = self.store.users();
        if let Some(username) = username {
            if users.find_by_username(tenant_id, username).await?.is_some() {
                return Err(TesseraError::already_exists("user", "username"));
            }
        }
        if let Some(email) = email {
            if users.find_by_email(tenant_id, email).await?.is_some() {
                return Err(TesseraError::already_exists("user", "email"));
            }
        }
        Ok(())
    }

    #[instrument(skip_all, fields(actor_id = %actor.user_id, tenant_id = %input.tenant_id))]
    pub async fn create_user(&self, actor: &Actor, input: CreateUserRequest) -> TesseraResult<User> {
        let tenant = self
            .guard
            .authorize(actor, input.tenant_id, Access::Write)
            .await?;

        let username = input.username.trim().to_string();
        if username.is_empty() {
            return Err(TesseraError::Validation {
                message: "username is required".into(),
            });
        }
        self.ensure_unique(tenant.id, Some(&username), input.email.as_deref())
            .await?;

        let password_hash = input.password.as_deref().map(|p| self.hash(p)).transpose()?;
        let identity = self
            .resolver
            .default_client_for_tenant(tenant.id)
            .await?
            .map(|client| IdentityBinding {
                auth_client_id: client.id,
                provider: DEFAULT_PROVIDER.into(),
            });

        let user = self
            .store
            .users()
            .create(CreateUser {
                tenant_id: tenant.id,
                organization_id: tenant.organization_id,
                username,
                email: input.email,
                password_hash,
                is_active: input.is_active,
                email_verified: input.email_verified,
                metadata: input.metadata,
                identity,
            })
            .await?;

        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    #[instrument(skip_all, fields(actor_id = %actor.user_id, %tenant_id, %user_id))]
    pub async fn update_user(
        &self,
        actor: &Actor,
        tenant_id: Uuid,
        user_id: Uuid,
        input: UpdateUserRequest,
    ) -> TesseraResult<User> {
        self.guard.authorize(actor, tenant_id, Access::Write).await?;
        let current = self.store.users().get_by_id(tenant_id, user_id).await?;

        let username = input.username.map(|u| u.trim().to_string());
        if username.as_deref() == Some("") {
            return Err(TesseraError::Validation {
                message: "username is required".into(),
            });
        }
        let new_username = username.as_deref().filter(|u| *u != current.username);
        let new_email = match &input.email {
            Some(Some(email)) if current.email.as_deref() != Some(email.as_str()) => {
                Some(email.as_str())
            }
            _ => None,
        };
        self.ensure_unique(tenant_id, new_username, new_email).await?;

        let password_hash = input.password.as_deref().map(|p| self.hash(p)).transpose()?;

        let user = self
            .store
            .users()
            .update(
                tenant_id,
                user_id,
                UpdateUser {
                    username,
                    email: input.email,
                    password_hash,
                    is_active: input.is_active,
                    email_verified: input.email_verified,
                    metadata: input.metadata,
                },
            )
            .await?;

        info!("User updated");
        Ok(user)
    }

    pub async fn deactivate_user(
        &self,
        actor: &Actor,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> TesseraResult<User> {
        self.update_user(
            actor,
            tenant_id,
            user_id,
            UpdateUserRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    /// Hard delete, cascading to everything the user owns.
    #[instrument(skip_all, fields(actor_id = %actor.user_id, %tenant_id, %user_id))]
    pub async fn delete_user(&self, actor: &Actor, tenant_id: Uuid, user_id: Uuid) -> TesseraResult<()> {
        self.guard.authorize(actor, tenant_id, Access::Write).await?;
        self.store.users().get_by_id(tenant_id, user_id).await?;
        self.store.users().delete(tenant_id, user_id).await?;
        info!("User deleted");
        Ok(())
    }

    /// Returns `true` when the role was newly assigned.
    #[instrument(skip_all, fields(actor_id = %actor.user_id, %tenant_id, %user_id, %role_id))]
    pub async fn assign_role(
        &self,
        actor: &Actor,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> TesseraResult<bool> {
        self.guard.authorize(actor, tenant_id, Access::Write).await?;
        self.store.users().get_by_id(tenant_id, user_id).await?;
        self.store.roles().get_by_id(tenant_id, role_id).await?;
        self.store
            .roles()
            .assign_to_user(tenant_id, user_id, role_id)
            .await
    }

    /// Returns `false` when the role was not assigned.
    #[instrument(skip_all, fields(actor_id = %actor.user_id, %tenant_id, %user_id, %role_id))]
    pub async fn remove_role(
        &self,
        actor: &Actor,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> TesseraResult<bool> {
        self.guard.authorize(actor, tenant_id, Access::Write).await?;
        self.store.users().get_by_id(tenant_id, user_id).await?;
        self.store.roles().get_by_id(tenant_id, role_id).await?;
        self.store
            .roles()
            .unassign_from_user(tenant_id, user_id, role_id)
            .await
    }

    /// Grant `user_id` (from any tenant) access to `tenant_id`.
    #[instrument(skip_all, fields(actor_id = %actor.user_id, %tenant_id, %user_id))]
    pub async fn grant_membership(
        &self,
        actor: &Actor,
        tenant_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> TesseraResult<TenantMember> {
        self.guard.authorize(actor, tenant_id, Access::Write).await?;
        let member = self
            .store
            .tenant_members()
            .upsert(tenant_id, user_id, role)
            .await?;
        info!(role = role.as_str(), "Tenant membership granted");
        Ok(member)
    }

    /// Returns `false` when no membership existed.
    #[instrument(skip_all, fields(actor_id = %actor.user_id, %tenant_id, %user_id))]
    pub async fn revoke_membership(
        &self,
        actor: &Actor,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> TesseraResult<bool> {
        self.guard.authorize(actor, tenant_id, Access::Write).await?;
        self.store.tenant_members().remove(tenant_id, user_id).await
    }

    pub async fn get_user(
        &self,
        actor: &Actor,
        tenant_id: Uuid,
        user_id: Uuid,
        include: UserInclude,
    ) -> TesseraResult<UserView> {
        let tenant = self.guard.authorize(actor, tenant_id, Access::Read).await?;
        let user = self.store.users().get_by_id(tenant_id, user_id).await?;

        let identities = if include.identities || include.auth_client {
            Some(
                self.store
                    .user_identities()
                    .list_by_user(tenant_id, user_id)
                    .await?,
            )
        } else {
            None
        };

        let auth_client = match (&identities, include.auth_client) {
            (Some(identities), true) => {
                match identities.iter().find(|i| i.provider == DEFAULT_PROVIDER) {
                    Some(identity) => Some(
                        self.store
                            .auth_clients()
                            .get_by_id(identity.auth_client_id)
                            .await?,
                    ),
                    None => None,
                }
            }
            _ => None,
        };

        let roles = if include.roles {
            Some(self.store.roles().get_user_roles(tenant_id, user_id).await?)
        } else {
            None
        };

        Ok(UserView {
            user,
            identities: identities.filter(|_| include.identities),
            roles,
            tenant: include.tenant.then_some(tenant),
            auth_client,
        })
    }
}
