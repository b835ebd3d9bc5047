//! Bearer token issuance/validation and opaque secret generation.
//!
//! Access and ID tokens are EdDSA (Ed25519) JWTs. Refresh tokens are
//! HS256 JWTs under a separate secret. Every token is bound to the
//! resolving client: `iss` is the client's domain and `aud` its
//! `client_id`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tessera_core::models::user::User;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Discriminates the three token kinds sharing one claim layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Id,
    Refresh,
}

/// JWT claims embedded in every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: user ID (UUID string).
    pub sub: String,
    /// Tenant ID (UUID string).
    pub tenant_id: String,
    /// Organization ID (UUID string).
    pub org_id: String,
    /// Issuer: the auth client's domain.
    pub iss: String,
    /// Audience: the auth client's `client_id`.
    pub aud: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID (UUID string).
    pub jti: String,
    pub token_use: TokenUse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

/// The user facts a token bundle is minted from.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub org_id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub email_verified: bool,
}

impl From<&User> for TokenSubject {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            tenant_id: user.tenant_id,
            org_id: user.organization_id,
            username: user.username.clone(),
            email: user.email.clone(),
            email_verified: user.email_verified,
        }
    }
}

/// Tokens returned by registration and login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenBundle {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: String,
    /// Always `"Bearer"`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub issued_at: DateTime<Utc>,
}

fn claims(
    subject: &TokenSubject,
    issuer: &str,
    audience: &str,
    token_use: TokenUse,
    now: i64,
    lifetime_secs: u64,
) -> TokenClaims {
    let identity = token_use == TokenUse::Id;
    TokenClaims {
        sub: subject.user_id.to_string(),
        tenant_id: subject.tenant_id.to_string(),
        org_id: subject.org_id.to_string(),
        iss: issuer.to_string(),
        aud: audience.to_string(),
        iat: now,
        exp: now + lifetime_secs as i64,
        jti: Uuid::new_v4().to_string(),
        token_use,
        preferred_username: identity.then(|| subject.username.clone()),
        email: if identity { subject.email.clone() } else { None },
        email_verified: identity.then_some(subject.email_verified),
    }
}

fn signing_key(token_use: TokenUse, config: &AuthConfig) -> Result<EncodingKey, AuthError> {
    match token_use {
        TokenUse::Access | TokenUse::Id => {
            EncodingKey::from_ed_pem(config.jwt_private_key_pem.as_bytes())
                .map_err(|e| AuthError::Crypto(format!("bad private key: {e}")))
        }
        TokenUse::Refresh => {
            if config.refresh_signing_secret.is_empty() {
                return Err(AuthError::Crypto("refresh signing secret is not set".into()));
            }
            Ok(EncodingKey::from_secret(
                config.refresh_signing_secret.as_bytes(),
            ))
        }
    }
}

fn verification_key(token_use: TokenUse, config: &AuthConfig) -> Result<DecodingKey, AuthError> {
    match token_use {
        TokenUse::Access | TokenUse::Id => {
            DecodingKey::from_ed_pem(config.jwt_public_key_pem.as_bytes())
                .map_err(|e| AuthError::Crypto(format!("bad public key: {e}")))
        }
        TokenUse::Refresh => {
            if config.refresh_signing_secret.is_empty() {
                return Err(AuthError::Crypto("refresh signing secret is not set".into()));
            }
            Ok(DecodingKey::from_secret(
                config.refresh_signing_secret.as_bytes(),
            ))
        }
    }
}

fn algorithm(token_use: TokenUse) -> Algorithm {
    match token_use {
        TokenUse::Access | TokenUse::Id => Algorithm::EdDSA,
        TokenUse::Refresh => Algorithm::HS256,
    }
}

/// Sign a single token of the given kind.
pub fn issue_token(
    subject: &TokenSubject,
    issuer: &str,
    audience: &str,
    token_use: TokenUse,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    let lifetime = match token_use {
        TokenUse::Access | TokenUse::Id => config.access_token_lifetime_secs,
        TokenUse::Refresh => config.refresh_token_lifetime_secs,
    };
    let claims = claims(
        subject,
        issuer,
        audience,
        token_use,
        Utc::now().timestamp(),
        lifetime,
    );

    let key = signing_key(token_use, config)?;
    jsonwebtoken::encode(&Header::new(algorithm(token_use)), &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Mint access, ID and refresh tokens for `subject` under the issuer
/// identity of one auth client.
pub fn issue_bundle(
    subject: &TokenSubject,
    issuer: &str,
    audience: &str,
    config: &AuthConfig,
) -> Result<TokenBundle, AuthError> {
    let issued_at = Utc::now();
    Ok(TokenBundle {
        access_token: issue_token(subject, issuer, audience, TokenUse::Access, config)?,
        id_token: issue_token(subject, issuer, audience, TokenUse::Id, config)?,
        refresh_token: issue_token(subject, issuer, audience, TokenUse::Refresh, config)?,
        token_type: "Bearer".into(),
        expires_in: config.access_token_lifetime_secs,
        issued_at,
    })
}

/// Verify signature, expiry, issuer, audience and token kind, and return
/// the claims.
///
/// Purely stateless: no database lookup is performed.
pub fn validate_token(
    token: &str,
    expected_use: TokenUse,
    issuer: &str,
    audience: &str,
    config: &AuthConfig,
) -> Result<TokenClaims, AuthError> {
    let key = verification_key(expected_use, config)?;

    let mut validation = Validation::new(algorithm(expected_use));
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[audience]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

    let claims = jsonwebtoken::decode::<TokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })?;

    if claims.token_use != expected_use {
        return Err(AuthError::TokenInvalid(format!(
            "expected {expected_use:?} token, got {:?}",
            claims.token_use
        )));
    }
    Ok(claims)
}

/// Generate a cryptographically random opaque secret
/// (32 bytes → 64 hex chars).
pub fn generate_opaque_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    hex::encode(bytes)
}

/// Generate a client secret (32 bytes → base64url-encoded, no padding).
pub fn generate_client_secret() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hash of a raw secret, hex-encoded.
///
/// This is the only form in which opaque tokens and client secrets are
/// persisted.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
