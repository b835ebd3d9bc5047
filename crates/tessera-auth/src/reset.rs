//! Password-reset orchestration.
//!
//! A reset token moves `issued → consumed | expired | revoked` and never
//! leaves a terminal state. Issuing a new token revokes the user's live
//! ones; redeeming a token revokes it together with every other live
//! reset token of the user.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tessera_core::collaborators::{OutboundMessage, SecurityEventRecorder, UrlSigner};
use tessera_core::error::{ErrorKind, TesseraError, TesseraResult};
use tessera_core::models::security_event::{SecurityEvent, SecurityEventType, Severity};
use tessera_core::models::user::User;
use tessera_core::models::user_token::{CreateUserToken, UserTokenType};
use tessera_core::repository::{
    CredentialStore, RedeemPasswordReset, UserRepository, UserTokenRepository,
};
use tracing::{info, instrument, warn};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::lockout::LoginAttemptTracker;
use crate::outbox::{DeliveryOutbox, PendingDelivery};
use crate::password::{self, PasswordPolicy};
use crate::resolver::{ClientResolver, ResolvedClient};
use crate::token;

/// Returned for every reset request that does not fail outright, so the
/// response never reveals whether the email is registered.
pub const RESET_REQUEST_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent.";

#[derive(Debug, Clone, Deserialize)]
pub struct ResetRequestInput {
    pub email: String,
    pub client_id: Option<String>,
    pub identity_provider_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetRequestOutcome {
    pub success: bool,
    pub message: String,
}

impl ResetRequestOutcome {
    fn generic() -> Self {
        Self {
            success: true,
            message: RESET_REQUEST_MESSAGE.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmResetInput {
    pub token: String,
    pub new_password: String,
    pub client_id: Option<String>,
    pub identity_provider_id: Option<String>,
}

pub struct PasswordResetService<S, U, R>
where
    S: CredentialStore,
    U: UrlSigner,
    R: SecurityEventRecorder,
{
    store: Arc<S>,
    resolver: ClientResolver<S>,
    lockout: Arc<LoginAttemptTracker>,
    outbox: DeliveryOutbox,
    signer: U,
    events: R,
    policy: PasswordPolicy,
    config: AuthConfig,
}

impl<S, U, R> PasswordResetService<S, U, R>
where
    S: CredentialStore,
    U: UrlSigner,
    R: SecurityEventRecorder,
{
    pub fn new(
        store: Arc<S>,
        lockout: Arc<LoginAttemptTracker>,
        outbox: DeliveryOutbox,
        signer: U,
        events: R,
        config: AuthConfig,
    ) -> Self {
        Self {
            resolver: ClientResolver::new(store.clone(), config.system_tenant_id),
            store,
            lockout,
            outbox,
            signer,
            events,
            policy: PasswordPolicy::new(config.min_password_length),
            config,
        }
    }

    /// Issue a reset token and queue the link for delivery, if the email
    /// belongs to an active user of the resolved client's tenant.
    ///
    /// Only client resolution and storage failures are surfaced; every
    /// other path returns the same generic outcome. Delivery happens on
    /// the [`DeliveryWorker`](crate::outbox::DeliveryWorker), never on
    /// this call.
    #[instrument(skip_all, fields(client_id = ?input.client_id))]
    pub async fn request_reset(&self, input: ResetRequestInput) -> TesseraResult<ResetRequestOutcome> {
        let resolved = self
            .resolver
            .resolve(
                input.client_id.as_deref(),
                input.identity_provider_id.as_deref(),
            )
            .await?;
        let tenant_id = resolved.tenant_id();
        let email = input.email.trim();

        let user = match self.store.users().find_by_email(tenant_id, email).await? {
            Some(user) if user.is_active => user,
            found => {
                let cause = if found.is_some() { "account_inactive" } else { "unknown_email" };
                info!(tenant_id = %tenant_id, cause, "Password reset request ignored");
                self.events
                    .record(SecurityEvent::new(
                        SecurityEventType::PasswordResetRequestIgnored,
                        token::hash_token(email),
                        json!({ "tenant_id": tenant_id, "cause": cause }),
                        Severity::Info,
                    ))
                    .await;
                return Ok(ResetRequestOutcome::generic());
            }
        };

        let raw_token = token::generate_opaque_token();
        let issued = self
            .store
            .user_tokens()
            .issue(CreateUserToken {
                tenant_id,
                user_id: user.id,
                token_type: UserTokenType::PasswordReset,
                token_hash: token::hash_token(&raw_token),
                expires_at: Some(
                    Utc::now() + Duration::seconds(self.config.password_reset_token_lifetime_secs as i64),
                ),
            })
            .await?;

        info!(user_id = %user.id, token_id = %issued.id, "Password reset token issued");
        self.events
            .record(SecurityEvent::new(
                SecurityEventType::PasswordResetRequested,
                user.id.to_string(),
                json!({ "tenant_id": tenant_id, "token_id": issued.id }),
                Severity::Info,
            ))
            .await;

        if let Err(cause) = self.enqueue(&user, &resolved, &raw_token) {
            warn!(user_id = %user.id, cause = %cause, "Password reset delivery failed");
            self.events
                .record(SecurityEvent::new(
                    SecurityEventType::PasswordResetDeliveryFailed,
                    user.id.to_string(),
                    json!({ "tenant_id": tenant_id, "cause": cause }),
                    Severity::Warning,
                ))
                .await;
        }

        Ok(ResetRequestOutcome::generic())
    }

    /// Sign the link and hand the message to the outbox.
    fn enqueue(
        &self,
        user: &User,
        resolved: &ResolvedClient,
        raw_token: &str,
    ) -> Result<(), String> {
        let recipient = user.email.clone().ok_or("user has no email")?;

        let link = self
            .signer
            .sign(
                &self.config.reset_link_base_url,
                &[
                    ("token", raw_token),
                    ("client_id", &resolved.client.client_id),
                    ("idp", &resolved.identity_provider.external_id),
                ],
                Duration::seconds(self.config.reset_link_ttl_secs as i64),
            )
            .map_err(|e| e.to_string())?;

        self.outbox.enqueue(PendingDelivery {
            tenant_id: user.tenant_id,
            user_id: user.id,
            message: reset_message(recipient, &user.username, &link),
        })
    }

    /// Redeem a reset token and set a new password.
    #[instrument(skip_all, fields(client_id = ?input.client_id))]
    pub async fn confirm_reset(&self, input: ConfirmResetInput) -> TesseraResult<()> {
        let fingerprint = token::hash_token(&input.token);

        match self.redeem(&input, &fingerprint).await {
            Ok(user) => {
                let tenant_id = user.tenant_id;
                self.lockout
                    .reset(&LoginAttemptTracker::key(tenant_id, &user.username));
                if let Some(email) = &user.email {
                    self.lockout.reset(&LoginAttemptTracker::key(tenant_id, email));
                }

                info!(user_id = %user.id, "Password reset completed");
                self.events
                    .record(SecurityEvent::new(
                        SecurityEventType::PasswordResetCompleted,
                        user.id.to_string(),
                        json!({ "tenant_id": tenant_id }),
                        Severity::Info,
                    ))
                    .await;
                Ok(())
            }
            Err(e) => {
                warn!(token_fingerprint = %fingerprint, cause = %e, "Password reset failed");
                self.events
                    .record(SecurityEvent::new(
                        SecurityEventType::PasswordResetFailed,
                        fingerprint,
                        json!({ "cause": e.to_string(), "kind": format!("{:?}", e.kind()) }),
                        Severity::Warning,
                    ))
                    .await;
                Err(e)
            }
        }
    }

    async fn redeem(&self, input: &ConfirmResetInput, fingerprint: &str) -> TesseraResult<User> {
        let resolved = self
            .resolver
            .resolve(
                input.client_id.as_deref(),
                input.identity_provider_id.as_deref(),
            )
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => TesseraError::from(AuthError::InvalidClient),
                _ => e,
            })?;
        let tenant_id = resolved.tenant_id();

        let token = self
            .store
            .user_tokens()
            .find_by_hash(UserTokenType::PasswordReset, fingerprint)
            .await?
            .filter(|t| t.tenant_id == tenant_id)
            .ok_or(AuthError::ResetTokenInvalid)?;

        if token.is_expired_at(Utc::now()) {
            return Err(AuthError::ResetTokenExpired.into());
        }
        if token.revoked {
            return Err(AuthError::ResetTokenRevoked.into());
        }

        let user = self
            .store
            .users()
            .get_by_id(tenant_id, token.user_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    TesseraError::from(AuthError::ResetTokenInvalid)
                } else {
                    e
                }
            })?;
        if !user.is_active {
            return Err(AuthError::AccountInactive.into());
        }

        self.policy.validate(&input.new_password)?;
        let password_hash =
            password::hash_password(&input.new_password, self.config.pepper.as_deref())?;

        self.store
            .user_tokens()
            .redeem_password_reset(RedeemPasswordReset {
                tenant_id,
                user_id: user.id,
                token_id: token.id,
                password_hash,
            })
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::Conflict => TesseraError::from(AuthError::ResetTokenRevoked),
                _ => e,
            })?;

        Ok(user)
    }
}

fn reset_message(recipient: String, username: &str, link: &str) -> OutboundMessage {
    OutboundMessage {
        recipient,
        subject: "Reset your password".into(),
        html_body: format!(
            "<p>Hello {username},</p>\
             <p>We received a request to reset your password. \
             <a href=\"{link}\">Choose a new password</a>.</p>\
             <p>If you did not ask for this, you can ignore this message.</p>"
        ),
        plain_body: format!(
            "Hello {username},\n\n\
             We received a request to reset your password. \
             Open the link below to choose a new one:\n\n{link}\n\n\
             If you did not ask for this, you can ignore this message.\n"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_carries_link_in_both_bodies() {
        let msg = reset_message("a@example.com".into(), "alice", "https://x/reset?token=t");
        assert_eq!(msg.recipient, "a@example.com");
        assert!(msg.plain_body.contains("https://x/reset?token=t"));
        assert!(msg.html_body.contains("href=\"https://x/reset?token=t\""));
    }

    #[test]
    fn outcome_is_generic() {
        let outcome = ResetRequestOutcome::generic();
        assert!(outcome.success);
        assert_eq!(outcome.message, RESET_REQUEST_MESSAGE);
    }
}
