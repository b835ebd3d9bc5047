//! Tenant access guard.
//!
//! Decides whether an actor may read or write inside a target tenant.
//! Elevation order:
//!
//! 1. `SystemAdmin` may act everywhere.
//! 2. `OrganizationAdmin` may act in every tenant of its organization.
//! 3. In the actor's own tenant, `TenantAdmin` may write and `Member`
//!    may read.
//! 4. In a foreign tenant, an `Admin` membership grant allows writes and
//!    a `Member` grant allows reads.
//!
//! Anything else is `Forbidden`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tessera_core::error::{TesseraError, TesseraResult};
use tessera_core::models::tenant::Tenant;
use tessera_core::models::tenant_member::MemberRole;
use tessera_core::repository::{CredentialStore, TenantMemberRepository, TenantRepository};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActorRole {
    SystemAdmin,
    OrganizationAdmin,
    TenantAdmin,
    Member,
}

/// The authenticated principal on whose behalf a mutation runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub role: ActorRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

fn allows(grant: Access, requested: Access) -> bool {
    grant == Access::Write || requested == Access::Read
}

/// Pure policy decision. `membership` is the actor's grant in the
/// target tenant, if any.
pub fn is_allowed(
    actor: &Actor,
    target: &Tenant,
    membership: Option<MemberRole>,
    access: Access,
) -> bool {
    match actor.role {
        ActorRole::SystemAdmin => return true,
        ActorRole::OrganizationAdmin if actor.organization_id == target.organization_id => {
            return true;
        }
        _ => {}
    }

    if actor.tenant_id == target.id {
        let grant = match actor.role {
            ActorRole::SystemAdmin | ActorRole::OrganizationAdmin | ActorRole::TenantAdmin => {
                Access::Write
            }
            ActorRole::Member => Access::Read,
        };
        return allows(grant, access);
    }

    match membership {
        Some(MemberRole::Admin) => true,
        Some(MemberRole::Member) => access == Access::Read,
        None => false,
    }
}

pub struct TenantAccessGuard<S: CredentialStore> {
    store: Arc<S>,
}

impl<S: CredentialStore> TenantAccessGuard<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Authorize `actor` against `tenant_id` and return the tenant.
    ///
    /// A missing tenant is `NotFound`; a denial is `Forbidden`.
    pub async fn authorize(
        &self,
        actor: &Actor,
        tenant_id: Uuid,
        access: Access,
    ) -> TesseraResult<Tenant> {
        let tenant = self.store.tenants().get_by_id(tenant_id).await?;

        let needs_membership = actor.tenant_id != tenant.id
            && actor.role != ActorRole::SystemAdmin
            && !(actor.role == ActorRole::OrganizationAdmin
                && actor.organization_id == tenant.organization_id);
        let membership = if needs_membership {
            self.store
                .tenant_members()
                .find(tenant.id, actor.user_id)
                .await?
                .map(|m| m.role)
        } else {
            None
        };

        if is_allowed(actor, &tenant, membership, access) {
            return Ok(tenant);
        }

        warn!(
            actor_id = %actor.user_id,
            actor_tenant_id = %actor.tenant_id,
            actor_role = ?actor.role,
            target_tenant_id = %tenant.id,
            access = ?access,
            "Tenant access denied"
        );
        Err(TesseraError::Forbidden {
            reason: format!("actor may not {access:?} tenant {}", tenant.id).to_lowercase(),
        })
    }
}
