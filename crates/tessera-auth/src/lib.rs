//! Tessera Auth: client resolution, password hashing, token issuance,
//! the password-reset workflow and tenant-scoped identity mutations.

pub mod clients;
pub mod config;
pub mod credentials;
pub mod error;
pub mod events;
pub mod guard;
pub mod identity;
pub mod lockout;
pub mod outbox;
pub mod password;
pub mod reset;
pub mod resolver;
pub mod signed_url;
pub mod token;

pub use clients::{ClientRegistry, CreateClientRequest, CreatedClient};
pub use config::AuthConfig;
pub use credentials::{CredentialService, LoginInput, RegisterInput};
pub use error::AuthError;
pub use events::TracingEventRecorder;
pub use guard::{Access, Actor, ActorRole, TenantAccessGuard};
pub use identity::{CreateUserRequest, IdentityService, UpdateUserRequest, UserInclude, UserView};
pub use lockout::{LockoutPolicy, LoginAttemptTracker};
pub use outbox::{DeliveryOutbox, DeliveryWorker, PendingDelivery, delivery_queue};
pub use reset::{ConfirmResetInput, PasswordResetService, ResetRequestInput, ResetRequestOutcome};
pub use resolver::{ClientResolver, ResolvedClient};
pub use signed_url::HmacUrlSigner;
pub use token::{TokenBundle, TokenClaims, TokenSubject, TokenUse};
