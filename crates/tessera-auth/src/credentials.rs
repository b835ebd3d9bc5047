//! Registration and login.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tessera_core::collaborators::SecurityEventRecorder;
use tessera_core::error::{TesseraError, TesseraResult};
use tessera_core::models::security_event::{SecurityEvent, SecurityEventType, Severity};
use tessera_core::models::user::{CreateUser, IdentityBinding, User};
use tessera_core::models::user_identity::DEFAULT_PROVIDER;
use tessera_core::repository::{CredentialStore, UserRepository};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::lockout::LoginAttemptTracker;
use crate::password::{self, PasswordPolicy};
use crate::resolver::{ClientResolver, ResolvedClient};
use crate::token::{self, TokenBundle, TokenSubject};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex should compile"));

/// Whether an identifier is shaped like an email address.
pub fn is_email(identifier: &str) -> bool {
    EMAIL_RE.is_match(identifier)
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub username_or_email: String,
    pub password: String,
    pub client_id: Option<String>,
    pub identity_provider_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
    pub client_id: Option<String>,
    pub identity_provider_id: Option<String>,
}

/// Internal cause of a rejected login, recorded but never returned.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum LoginFailure {
    ClientUnresolved,
    LockedOut,
    UserNotFound,
    NoPassword,
    PasswordMismatch,
    MalformedHash,
    AccountInactive,
}

/// Credential service.
///
/// Generic over the store and event sink so that the auth layer has no
/// dependency on the database crate.
pub struct CredentialService<S: CredentialStore, R: SecurityEventRecorder> {
    store: Arc<S>,
    resolver: ClientResolver<S>,
    lockout: Arc<LoginAttemptTracker>,
    events: R,
    policy: PasswordPolicy,
    config: AuthConfig,
}

impl<S: CredentialStore, R: SecurityEventRecorder> CredentialService<S, R> {
    pub fn new(
        store: Arc<S>,
        lockout: Arc<LoginAttemptTracker>,
        events: R,
        config: AuthConfig,
    ) -> Self {
        Self {
            resolver: ClientResolver::new(store.clone(), config.system_tenant_id),
            store,
            lockout,
            events,
            policy: PasswordPolicy::new(config.min_password_length),
            config,
        }
    }

    /// Create a user bound to the resolving client and sign them in.
    #[instrument(skip_all, fields(client_id = ?input.client_id))]
    pub async fn register(&self, input: RegisterInput) -> TesseraResult<TokenBundle> {
        let resolved = self
            .resolver
            .resolve(
                input.client_id.as_deref(),
                input.identity_provider_id.as_deref(),
            )
            .await?;
        let tenant_id = resolved.tenant_id();

        let identifier = input.username_or_email.trim().to_string();
        if identifier.is_empty() {
            return Err(TesseraError::Validation {
                message: "username or email is required".into(),
            });
        }
        let email = is_email(&identifier).then(|| identifier.clone());

        let users = self.store.users();
        if users.find_by_username(tenant_id, &identifier).await?.is_some() {
            return Err(TesseraError::already_exists("user", "username"));
        }
        if let Some(email) = &email {
            if users.find_by_email(tenant_id, email).await?.is_some() {
                return Err(TesseraError::already_exists("user", "email"));
            }
        }

        self.policy.validate(&input.password)?;
        let password_hash = password::hash_password(&input.password, self.config.pepper.as_deref())?;

        let user = users
            .create(CreateUser {
                tenant_id,
                organization_id: resolved.organization_id(),
                username: identifier,
                email,
                password_hash: Some(password_hash),
                is_active: true,
                email_verified: false,
                metadata: None,
                identity: Some(IdentityBinding {
                    auth_client_id: resolved.client.id,
                    provider: DEFAULT_PROVIDER.into(),
                }),
            })
            .await?;

        let bundle = self.issue(&user, &resolved)?;

        info!(user_id = %user.id, tenant_id = %tenant_id, "User registered");
        self.events
            .record(SecurityEvent::new(
                SecurityEventType::UserRegistered,
                user.id.to_string(),
                json!({
                    "tenant_id": tenant_id,
                    "client_id": resolved.client.client_id,
                }),
                Severity::Info,
            ))
            .await;

        Ok(bundle)
    }

    /// Authenticate with username/email + password and issue tokens.
    ///
    /// Every rejection is the same `InvalidCredential`.
    #[instrument(skip_all, fields(client_id = ?input.client_id))]
    pub async fn login(&self, input: LoginInput) -> TesseraResult<TokenBundle> {
        let identifier = input.username_or_email.trim();

        let resolved = match self
            .resolver
            .resolve(
                input.client_id.as_deref(),
                input.identity_provider_id.as_deref(),
            )
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_not_found() => {
                password::verify_dummy(&input.password, self.config.pepper.as_deref());
                return Err(self
                    .reject(identifier, None, None, LoginFailure::ClientUnresolved)
                    .await);
            }
            Err(e) => return Err(e),
        };
        let tenant_id = resolved.tenant_id();
        let key = LoginAttemptTracker::key(tenant_id, identifier);

        if self.lockout.is_locked(&key) {
            password::verify_dummy(&input.password, self.config.pepper.as_deref());
            return Err(self
                .reject(identifier, None, None, LoginFailure::LockedOut)
                .await);
        }

        let user = match self.find_user(tenant_id, identifier).await? {
            Some(user) => user,
            None => {
                password::verify_dummy(&input.password, self.config.pepper.as_deref());
                return Err(self
                    .reject(identifier, Some(&key), None, LoginFailure::UserNotFound)
                    .await);
            }
        };

        if let Err(cause) = self.check_password(&user, &input.password) {
            return Err(self
                .reject(identifier, Some(&key), Some(&user), cause)
                .await);
        }

        self.lockout.reset(&key);
        let bundle = self.issue(&user, &resolved)?;

        info!(user_id = %user.id, tenant_id = %tenant_id, "Login succeeded");
        self.events
            .record(SecurityEvent::new(
                SecurityEventType::LoginSucceeded,
                user.id.to_string(),
                json!({
                    "tenant_id": tenant_id,
                    "client_id": resolved.client.client_id,
                }),
                Severity::Info,
            ))
            .await;

        Ok(bundle)
    }

    fn check_password(&self, user: &User, password: &str) -> Result<(), LoginFailure> {
        let pepper = self.config.pepper.as_deref();
        let Some(hash) = user.password_hash.as_deref() else {
            password::verify_dummy(password, pepper);
            return Err(LoginFailure::NoPassword);
        };

        match password::verify_password(password, hash, pepper) {
            Ok(true) if user.is_active => Ok(()),
            Ok(true) => Err(LoginFailure::AccountInactive),
            Ok(false) => Err(LoginFailure::PasswordMismatch),
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Stored password hash is unreadable");
                Err(LoginFailure::MalformedHash)
            }
        }
    }

    /// Email lookup first when the identifier looks like one, then
    /// username.
    async fn find_user(&self, tenant_id: Uuid, identifier: &str) -> TesseraResult<Option<User>> {
        let users = self.store.users();
        if is_email(identifier) {
            if let Some(user) = users.find_by_email(tenant_id, identifier).await? {
                return Ok(Some(user));
            }
        }
        users.find_by_username(tenant_id, identifier).await
    }

    async fn reject(
        &self,
        identifier: &str,
        key: Option<&str>,
        user: Option<&User>,
        cause: LoginFailure,
    ) -> TesseraError {
        if let Some(key) = key {
            self.lockout.record_failure(key);
        }

        let subject = user
            .map(|u| u.id.to_string())
            .unwrap_or_else(|| identifier.to_string());
        warn!(subject = %subject, cause = ?cause, "Login rejected");
        self.events
            .record(SecurityEvent::new(
                SecurityEventType::LoginFailed,
                subject,
                json!({ "cause": cause }),
                Severity::Warning,
            ))
            .await;

        AuthError::InvalidCredentials.into()
    }

    fn issue(&self, user: &User, resolved: &ResolvedClient) -> TesseraResult<TokenBundle> {
        Ok(token::issue_bundle(
            &TokenSubject::from(user),
            &resolved.issuer,
            &resolved.client.client_id,
            &self.config,
        )?)
    }
}
