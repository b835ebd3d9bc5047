//! Credential engine configuration.

use uuid::Uuid;

/// Configuration for the credential, token and password-reset services.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for access/ID token signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for access/ID token verification.
    pub jwt_public_key_pem: String,
    /// HS256 secret for refresh tokens. Kept apart from the Ed25519 pair
    /// so a refresh token can never validate as an access token.
    pub refresh_signing_secret: String,
    /// Access and ID token lifetime in seconds (default: 3600 = 1 hour).
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 2_592_000 = 30 days).
    pub refresh_token_lifetime_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Minimum password length for policy enforcement.
    pub min_password_length: usize,
    /// Max consecutive failed login attempts before lockout (default: 5).
    pub max_failed_login_attempts: u32,
    /// Initial lockout duration in seconds (default: 300 = 5 min).
    pub lockout_duration_secs: u64,
    /// Exponential backoff multiplier for repeated lockouts (default: 2.0).
    pub lockout_backoff_multiplier: f64,
    /// Maximum lockout duration in seconds (default: 3600 = 1 hour).
    pub max_lockout_duration_secs: u64,
    /// Password-reset token lifetime in seconds (default: 3600).
    pub password_reset_token_lifetime_secs: u64,
    /// Base URL of the page that consumes reset links.
    pub reset_link_base_url: String,
    /// Validity of the signed reset link in seconds (default: 3600).
    pub reset_link_ttl_secs: u64,
    /// HMAC-SHA256 key for signed links.
    pub url_signing_key: String,
    /// Upper bound on a single message delivery attempt (default: 10s).
    pub delivery_timeout_secs: u64,
    /// Messages that may wait for the delivery worker (default: 1024).
    pub delivery_queue_capacity: usize,
    /// Tenant whose default provider and client serve requests that name
    /// neither a client nor a provider. `None` disables the fallback.
    pub system_tenant_id: Option<Uuid>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            refresh_signing_secret: String::new(),
            access_token_lifetime_secs: 3600,
            refresh_token_lifetime_secs: 2_592_000,
            pepper: None,
            min_password_length: 12,
            max_failed_login_attempts: 5,
            lockout_duration_secs: 300,
            lockout_backoff_multiplier: 2.0,
            max_lockout_duration_secs: 3600,
            password_reset_token_lifetime_secs: 3600,
            reset_link_base_url: "http://localhost:3000/reset-password".into(),
            reset_link_ttl_secs: 3600,
            url_signing_key: String::new(),
            delivery_timeout_secs: 10,
            delivery_queue_capacity: 1024,
            system_tenant_id: None,
        }
    }
}
