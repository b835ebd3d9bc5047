//! Password-reset request and confirmation.

mod common;

use std::time::{Duration, Instant};

use chrono::Utc;
use common::{DeliveryMode, Harness, STRONG_PASSWORD};
use tessera_auth::reset::RESET_REQUEST_MESSAGE;
use tessera_auth::{ConfirmResetInput, LoginInput, RegisterInput, ResetRequestInput};
use tessera_core::error::{ErrorKind, TesseraError};
use tessera_core::models::security_event::SecurityEventType;
use tessera_core::models::user::UpdateUser;
use tessera_core::models::user_token::UserTokenType;
use tessera_core::repository::{CredentialStore, UserRepository, UserTokenRepository};

const NEW_PASSWORD: &str = "Brand-New-Password-7";

async fn registered(h: &Harness, fx: &common::TenantFixture, email: &str) {
    h.credentials()
        .register(RegisterInput {
            username_or_email: email.into(),
            password: STRONG_PASSWORD.into(),
            client_id: fx.client_id(),
            identity_provider_id: None,
        })
        .await
        .unwrap();
}

fn request(fx: &common::TenantFixture, email: &str) -> ResetRequestInput {
    ResetRequestInput {
        email: email.into(),
        client_id: fx.client_id(),
        identity_provider_id: None,
    }
}

fn confirm(fx: &common::TenantFixture, token: &str, password: &str) -> ConfirmResetInput {
    ConfirmResetInput {
        token: token.into(),
        new_password: password.into(),
        client_id: fx.client_id(),
        identity_provider_id: None,
    }
}

fn reason(err: TesseraError) -> String {
    assert_eq!(err.kind(), ErrorKind::InvalidCredential, "{err:?}");
    err.to_string()
}

async fn live_tokens(h: &Harness, fx: &common::TenantFixture, email: &str) -> usize {
    let user = h
        .store
        .users()
        .find_by_email(fx.tenant.id, email)
        .await
        .unwrap()
        .unwrap();
    h.store
        .user_tokens()
        .list_live(fx.tenant.id, user.id, UserTokenType::PasswordReset)
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn unknown_and_inactive_emails_get_the_generic_outcome() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    registered(&h, &acme, "alice@example.com").await;
    registered(&h, &acme, "carol@example.com").await;

    let carol = h
        .store
        .users()
        .find_by_email(acme.tenant.id, "carol@example.com")
        .await
        .unwrap()
        .unwrap();
    h.store
        .users()
        .update(
            acme.tenant.id,
            carol.id,
            UpdateUser {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let resets = h.resets();
    let known = resets.request_reset(request(&acme, "alice@example.com")).await.unwrap();
    let unknown = resets.request_reset(request(&acme, "nobody@example.com")).await.unwrap();
    let inactive = resets.request_reset(request(&acme, "carol@example.com")).await.unwrap();

    assert_eq!(known, unknown);
    assert_eq!(known, inactive);
    assert!(known.success);
    assert_eq!(known.message, RESET_REQUEST_MESSAGE);

    assert_eq!(h.dispatcher.wait_for_sent(1).await.len(), 1);
    assert_eq!(live_tokens(&h, &acme, "carol@example.com").await, 0);
    assert_eq!(
        h.events
            .of_type(SecurityEventType::PasswordResetRequestIgnored)
            .len(),
        2
    );
}

#[tokio::test]
async fn link_is_signed_and_names_the_client() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    registered(&h, &acme, "alice@example.com").await;

    h.resets()
        .request_reset(request(&acme, "alice@example.com"))
        .await
        .unwrap();

    let message = h.dispatcher.wait_for_sent(1).await.pop().unwrap();
    assert_eq!(message.recipient, "alice@example.com");

    let link = common::link_from_message(&message);
    assert!(link.starts_with("https://app.example.com/reset-password?"));
    let params = h.signer().verify(&link, Utc::now()).unwrap();
    let get = |name: &str| {
        params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
            .unwrap()
    };
    assert_eq!(get("token").len(), 64);
    assert_eq!(get("client_id"), "acme-web");
    assert_eq!(get("idp"), "acme-idp");
}

#[tokio::test]
async fn token_is_single_use() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    registered(&h, &acme, "alice@example.com").await;
    let resets = h.resets();

    resets
        .request_reset(request(&acme, "alice@example.com"))
        .await
        .unwrap();
    let token = h.dispatcher.next_token().await;

    resets.confirm_reset(confirm(&acme, &token, NEW_PASSWORD)).await.unwrap();
    let err = resets
        .confirm_reset(confirm(&acme, &token, "Another-Password-8"))
        .await
        .unwrap_err();
    assert_eq!(reason(err), "reset token has been revoked");

    h.credentials()
        .login(LoginInput {
            username_or_email: "alice@example.com".into(),
            password: NEW_PASSWORD.into(),
            client_id: acme.client_id(),
            identity_provider_id: None,
        })
        .await
        .unwrap();

    assert_eq!(
        h.events.of_type(SecurityEventType::PasswordResetCompleted).len(),
        1
    );
    let failed = h.events.of_type(SecurityEventType::PasswordResetFailed);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].subject_id, tessera_auth::token::hash_token(&token));
}

#[tokio::test]
async fn new_request_revokes_previous_token() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    registered(&h, &acme, "alice@example.com").await;
    let resets = h.resets();

    resets
        .request_reset(request(&acme, "alice@example.com"))
        .await
        .unwrap();
    let first = h.dispatcher.next_token().await;
    resets
        .request_reset(request(&acme, "alice@example.com"))
        .await
        .unwrap();
    let second = h.dispatcher.next_token().await;
    assert_ne!(first, second);
    assert_eq!(live_tokens(&h, &acme, "alice@example.com").await, 1);

    let err = resets
        .confirm_reset(confirm(&acme, &first, NEW_PASSWORD))
        .await
        .unwrap_err();
    assert_eq!(reason(err), "reset token has been revoked");

    resets.confirm_reset(confirm(&acme, &second, NEW_PASSWORD)).await.unwrap();
    assert_eq!(live_tokens(&h, &acme, "alice@example.com").await, 0);
}

#[tokio::test]
async fn weak_password_leaves_token_usable() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    registered(&h, &acme, "alice@example.com").await;
    let resets = h.resets();

    resets
        .request_reset(request(&acme, "alice@example.com"))
        .await
        .unwrap();
    let token = h.dispatcher.next_token().await;

    let err = resets
        .confirm_reset(confirm(&acme, &token, "weak"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    resets.confirm_reset(confirm(&acme, &token, NEW_PASSWORD)).await.unwrap();
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let h = Harness::with_config(tessera_auth::AuthConfig {
        password_reset_token_lifetime_secs: 0,
        ..common::test_config()
    })
    .await;
    let acme = h.tenant("acme").await;
    registered(&h, &acme, "alice@example.com").await;
    let resets = h.resets();

    resets
        .request_reset(request(&acme, "alice@example.com"))
        .await
        .unwrap();
    let token = h.dispatcher.next_token().await;

    let err = resets
        .confirm_reset(confirm(&acme, &token, NEW_PASSWORD))
        .await
        .unwrap_err();
    assert_eq!(reason(err), "reset token has expired");
}

#[tokio::test]
async fn unknown_or_foreign_token_is_invalid() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    let globex = h.tenant("globex").await;
    registered(&h, &acme, "alice@example.com").await;
    let resets = h.resets();

    let err = resets
        .confirm_reset(confirm(&acme, &"ab".repeat(32), NEW_PASSWORD))
        .await
        .unwrap_err();
    assert_eq!(reason(err), "invalid or expired reset token");

    resets
        .request_reset(request(&acme, "alice@example.com"))
        .await
        .unwrap();
    let token = h.dispatcher.next_token().await;
    let err = resets
        .confirm_reset(confirm(&globex, &token, NEW_PASSWORD))
        .await
        .unwrap_err();
    assert_eq!(reason(err), "invalid or expired reset token");

    // Still redeemable under its own tenant.
    resets.confirm_reset(confirm(&acme, &token, NEW_PASSWORD)).await.unwrap();
}

#[tokio::test]
async fn unresolvable_client_on_confirm() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;

    let err = h
        .resets()
        .confirm_reset(ConfirmResetInput {
            client_id: Some("nope".into()),
            ..confirm(&acme, "whatever", NEW_PASSWORD)
        })
        .await
        .unwrap_err();
    assert_eq!(reason(err), "invalid client credentials");
}

#[tokio::test]
async fn unresolvable_client_on_request_is_a_hard_error() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;

    let err = h
        .resets()
        .request_reset(ResetRequestInput {
            client_id: Some("nope".into()),
            ..request(&acme, "alice@example.com")
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn delivery_failure_is_not_surfaced() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    registered(&h, &acme, "alice@example.com").await;
    h.dispatcher.set_mode(DeliveryMode::Fail);

    let outcome = h
        .resets()
        .request_reset(request(&acme, "alice@example.com"))
        .await
        .unwrap();
    assert_eq!(outcome.message, RESET_REQUEST_MESSAGE);

    // The token was committed before delivery was attempted.
    assert_eq!(live_tokens(&h, &acme, "alice@example.com").await, 1);
    let failed = h
        .events
        .wait_for(SecurityEventType::PasswordResetDeliveryFailed, 1)
        .await;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].detail["tenant_id"], acme.tenant.id.to_string());
    assert!(
        failed[0].detail["cause"]
            .as_str()
            .unwrap()
            .contains("smtp relay refused")
    );
}

#[tokio::test]
async fn hung_delivery_does_not_delay_the_response() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    registered(&h, &acme, "alice@example.com").await;
    h.dispatcher.set_mode(DeliveryMode::Hang);
    let resets = h.resets();

    let started = Instant::now();
    let known = resets
        .request_reset(request(&acme, "alice@example.com"))
        .await
        .unwrap();
    let known_elapsed = started.elapsed();

    let started = Instant::now();
    let unknown = resets
        .request_reset(request(&acme, "nobody@example.com"))
        .await
        .unwrap();
    let unknown_elapsed = started.elapsed();

    assert_eq!(known, unknown);
    // The delivery timeout is 2s; neither response may wait on it.
    assert!(known_elapsed < Duration::from_secs(1), "{known_elapsed:?}");
    assert!(unknown_elapsed < Duration::from_secs(1), "{unknown_elapsed:?}");
    assert!(
        h.events
            .of_type(SecurityEventType::PasswordResetDeliveryFailed)
            .is_empty()
    );

    let failed = h
        .events
        .wait_for(SecurityEventType::PasswordResetDeliveryFailed, 1)
        .await;
    assert_eq!(failed.len(), 1);
    assert!(
        failed[0].detail["cause"]
            .as_str()
            .unwrap()
            .contains("timed out after 2s")
    );
}

#[tokio::test]
async fn concurrent_confirms_redeem_once() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    registered(&h, &acme, "alice@example.com").await;
    let resets = h.resets();

    for round in 0..5 {
        resets
            .request_reset(request(&acme, "alice@example.com"))
            .await
            .unwrap();
        let token = h.dispatcher.next_token().await;

        let (first, second) = tokio::join!(
            resets.confirm_reset(confirm(&acme, &token, NEW_PASSWORD)),
            resets.confirm_reset(confirm(&acme, &token, "Another-Password-8")),
        );
        let loser = match (first, second) {
            (Ok(()), Err(e)) | (Err(e), Ok(())) => e,
            other => panic!("round {round}: expected exactly one redemption, got {other:?}"),
        };
        assert_eq!(reason(loser), "reset token has been revoked");
        assert_eq!(live_tokens(&h, &acme, "alice@example.com").await, 0);
    }

    assert_eq!(
        h.events.of_type(SecurityEventType::PasswordResetCompleted).len(),
        5
    );
}

#[tokio::test]
async fn completed_reset_clears_lockout() {
    let h = Harness::new().await;
    let acme = h.tenant("acme").await;
    registered(&h, &acme, "alice@example.com").await;
    let svc = h.credentials();
    let login = |password: &str| LoginInput {
        username_or_email: "alice@example.com".into(),
        password: password.into(),
        client_id: acme.client_id(),
        identity_provider_id: None,
    };

    for _ in 0..h.config.max_failed_login_attempts {
        svc.login(login("Wrong-Password-1")).await.unwrap_err();
    }

    let resets = h.resets();
    resets
        .request_reset(request(&acme, "alice@example.com"))
        .await
        .unwrap();
    let token = h.dispatcher.next_token().await;
    resets.confirm_reset(confirm(&acme, &token, NEW_PASSWORD)).await.unwrap();

    svc.login(login(NEW_PASSWORD)).await.unwrap();
}
