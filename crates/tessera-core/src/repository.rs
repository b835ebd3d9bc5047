//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Tenant-scoped repositories
//! require a `tenant_id` parameter to enforce data isolation: a record
//! that exists under another tenant is reported as not found.
//!
//! Operations documented as atomic must commit all of their writes in
//! a single transaction or none of them.

use uuid::Uuid;

use crate::error::TesseraResult;
use crate::models::{
    auth_client::{AuthClient, CreateAuthClient, UpdateAuthClient},
    identity_provider::{CreateIdentityProvider, IdentityProvider},
    organization::{CreateOrganization, Organization},
    role::{CreateRole, Role},
    tenant::{CreateTenant, Tenant},
    tenant_member::{MemberRole, TenantMember},
    user::{CreateUser, UpdateUser, User},
    user_identity::UserIdentity,
    user_token::{CreateUserToken, UserToken, UserTokenType},
};

// ---------------------------------------------------------------------------
// Organization & Tenant (global scope)
// ---------------------------------------------------------------------------

pub trait OrganizationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOrganization,
    ) -> impl Future<Output = TesseraResult<Organization>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TesseraResult<Organization>> + Send;
}

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = TesseraResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TesseraResult<Tenant>> + Send;
}

// ---------------------------------------------------------------------------
// Identity providers & auth clients
// ---------------------------------------------------------------------------

pub trait IdentityProviderRepository: Send + Sync {
    /// Fails with `Conflict` when `is_default` is set and the tenant
    /// already has a default provider.
    fn create(
        &self,
        input: CreateIdentityProvider,
    ) -> impl Future<Output = TesseraResult<IdentityProvider>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TesseraResult<IdentityProvider>> + Send;
    fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> impl Future<Output = TesseraResult<Option<IdentityProvider>>> + Send;
    fn find_default(
        &self,
        tenant_id: Uuid,
    ) -> impl Future<Output = TesseraResult<Option<IdentityProvider>>> + Send;
}

pub trait AuthClientRepository: Send + Sync {
    fn create(
        &self,
        input: CreateAuthClient,
    ) -> impl Future<Output = TesseraResult<AuthClient>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = TesseraResult<AuthClient>> + Send;
    fn find_by_client_id(
        &self,
        client_id: &str,
    ) -> impl Future<Output = TesseraResult<Option<AuthClient>>> + Send;
    fn find_by_name(
        &self,
        identity_provider_id: Uuid,
        name: &str,
    ) -> impl Future<Output = TesseraResult<Option<AuthClient>>> + Send;
    fn find_default(
        &self,
        identity_provider_id: Uuid,
    ) -> impl Future<Output = TesseraResult<Option<AuthClient>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateAuthClient,
    ) -> impl Future<Output = TesseraResult<AuthClient>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = TesseraResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-scoped repositories
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    /// Atomic: the optional identity binding is written in the same
    /// transaction as the user.
    fn create(&self, input: CreateUser) -> impl Future<Output = TesseraResult<User>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = TesseraResult<User>> + Send;
    fn find_by_username(
        &self,
        tenant_id: Uuid,
        username: &str,
    ) -> impl Future<Output = TesseraResult<Option<User>>> + Send;
    fn find_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> impl Future<Output = TesseraResult<Option<User>>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = TesseraResult<User>> + Send;
    /// Hard delete. Atomic: identities, tokens, role edges and
    /// memberships owned by the user are removed with it.
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = TesseraResult<()>> + Send;
}

pub trait UserIdentityRepository: Send + Sync {
    fn create(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        auth_client_id: Uuid,
        provider: &str,
        subject: &str,
        metadata: serde_json::Value,
    ) -> impl Future<Output = TesseraResult<UserIdentity>> + Send;
    fn list_by_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = TesseraResult<Vec<UserIdentity>>> + Send;
}

/// Input for the atomic password-reset redemption.
#[derive(Debug, Clone)]
pub struct RedeemPasswordReset {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub token_id: Uuid,
    pub password_hash: String,
}

pub trait UserTokenRepository: Send + Sync {
    /// Atomic: revokes every live token of the same type held by the
    /// user, then persists the new one.
    fn issue(&self, input: CreateUserToken)
    -> impl Future<Output = TesseraResult<UserToken>> + Send;

    /// Indexed point lookup by digest and type. Revoked and expired
    /// tokens are returned so callers can tell the cases apart.
    fn find_by_hash(
        &self,
        token_type: UserTokenType,
        token_hash: &str,
    ) -> impl Future<Output = TesseraResult<Option<UserToken>>> + Send;

    fn list_live(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        token_type: UserTokenType,
    ) -> impl Future<Output = TesseraResult<Vec<UserToken>>> + Send;

    /// Atomic: claims the token with a `revoked = false` check-and-set,
    /// stores the new password hash and revokes the user's remaining
    /// live reset tokens. Fails with `Conflict` when the token was
    /// already revoked, leaving everything unchanged.
    fn redeem_password_reset(
        &self,
        input: RedeemPasswordReset,
    ) -> impl Future<Output = TesseraResult<()>> + Send;
}

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = TesseraResult<Role>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = TesseraResult<Role>> + Send;

    /// Returns `false` when the assignment already existed.
    fn assign_to_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = TesseraResult<bool>> + Send;

    /// Returns `false` when there was nothing to remove.
    fn unassign_from_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = TesseraResult<bool>> + Send;

    fn get_user_roles(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = TesseraResult<Vec<Role>>> + Send;
}

pub trait TenantMemberRepository: Send + Sync {
    /// Creates the membership or replaces the role of an existing one.
    fn upsert(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> impl Future<Output = TesseraResult<TenantMember>> + Send;
    fn find(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = TesseraResult<Option<TenantMember>>> + Send;
    /// Returns `false` when no membership existed.
    fn remove(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = TesseraResult<bool>> + Send;
}

// ---------------------------------------------------------------------------
// Store bundle
// ---------------------------------------------------------------------------

/// Every repository the credential engine needs, backed by one store.
pub trait CredentialStore: Send + Sync {
    type Organizations: OrganizationRepository;
    type Tenants: TenantRepository;
    type IdentityProviders: IdentityProviderRepository;
    type AuthClients: AuthClientRepository;
    type Users: UserRepository;
    type UserIdentities: UserIdentityRepository;
    type UserTokens: UserTokenRepository;
    type Roles: RoleRepository;
    type TenantMembers: TenantMemberRepository;

    fn organizations(&self) -> &Self::Organizations;
    fn tenants(&self) -> &Self::Tenants;
    fn identity_providers(&self) -> &Self::IdentityProviders;
    fn auth_clients(&self) -> &Self::AuthClients;
    fn users(&self) -> &Self::Users;
    fn user_identities(&self) -> &Self::UserIdentities;
    fn user_tokens(&self) -> &Self::UserTokens;
    fn roles(&self) -> &Self::Roles;
    fn tenant_members(&self) -> &Self::TenantMembers;
}
