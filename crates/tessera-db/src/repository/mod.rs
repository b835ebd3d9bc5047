//! SurrealDB repository implementations.

mod auth_client;
mod identity_provider;
mod organization;
mod role;
mod tenant;
mod tenant_member;
mod user;
mod user_identity;
mod user_token;

use surrealdb::{Connection, Surreal};
use tessera_core::repository::CredentialStore;

pub use auth_client::SurrealAuthClientRepository;
pub use identity_provider::SurrealIdentityProviderRepository;
pub use organization::SurrealOrganizationRepository;
pub use role::SurrealRoleRepository;
pub use tenant::SurrealTenantRepository;
pub use tenant_member::SurrealTenantMemberRepository;
pub use user::SurrealUserRepository;
pub use user_identity::SurrealUserIdentityRepository;
pub use user_token::SurrealUserTokenRepository;

/// All repositories over one SurrealDB handle.
#[derive(Clone)]
pub struct SurrealStore<C: Connection> {
    organizations: SurrealOrganizationRepository<C>,
    tenants: SurrealTenantRepository<C>,
    identity_providers: SurrealIdentityProviderRepository<C>,
    auth_clients: SurrealAuthClientRepository<C>,
    users: SurrealUserRepository<C>,
    user_identities: SurrealUserIdentityRepository<C>,
    user_tokens: SurrealUserTokenRepository<C>,
    roles: SurrealRoleRepository<C>,
    tenant_members: SurrealTenantMemberRepository<C>,
}

impl<C: Connection> SurrealStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            organizations: SurrealOrganizationRepository::new(db.clone()),
            tenants: SurrealTenantRepository::new(db.clone()),
            identity_providers: SurrealIdentityProviderRepository::new(db.clone()),
            auth_clients: SurrealAuthClientRepository::new(db.clone()),
            users: SurrealUserRepository::new(db.clone()),
            user_identities: SurrealUserIdentityRepository::new(db.clone()),
            user_tokens: SurrealUserTokenRepository::new(db.clone()),
            roles: SurrealRoleRepository::new(db.clone()),
            tenant_members: SurrealTenantMemberRepository::new(db),
        }
    }
}

impl<C: Connection> CredentialStore for SurrealStore<C> {
    type Organizations = SurrealOrganizationRepository<C>;
    type Tenants = SurrealTenantRepository<C>;
    type IdentityProviders = SurrealIdentityProviderRepository<C>;
    type AuthClients = SurrealAuthClientRepository<C>;
    type Users = SurrealUserRepository<C>;
    type UserIdentities = SurrealUserIdentityRepository<C>;
    type UserTokens = SurrealUserTokenRepository<C>;
    type Roles = SurrealRoleRepository<C>;
    type TenantMembers = SurrealTenantMemberRepository<C>;

    fn organizations(&self) -> &Self::Organizations {
        &self.organizations
    }
    fn tenants(&self) -> &Self::Tenants {
        &self.tenants
    }
    fn identity_providers(&self) -> &Self::IdentityProviders {
        &self.identity_providers
    }
    fn auth_clients(&self) -> &Self::AuthClients {
        &self.auth_clients
    }
    fn users(&self) -> &Self::Users {
        &self.users
    }
    fn user_identities(&self) -> &Self::UserIdentities {
        &self.user_identities
    }
    fn user_tokens(&self) -> &Self::UserTokens {
        &self.user_tokens
    }
    fn roles(&self) -> &Self::Roles {
        &self.roles
    }
    fn tenant_members(&self) -> &Self::TenantMembers {
        &self.tenant_members
    }
}
