//! HMAC-SHA256 signed, time-bounded URLs.
//!
//! The signature covers the whole query string, including the
//! `expires` parameter, serialized in order. `signature` is always the
//! last parameter.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tessera_core::collaborators::UrlSigner;
use tessera_core::error::{TesseraError, TesseraResult};
use url::Url;
use url::form_urlencoded::Serializer;

use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

const EXPIRES_PARAM: &str = "expires";
const SIGNATURE_PARAM: &str = "signature";

#[derive(Clone)]
pub struct HmacUrlSigner {
    key: Vec<u8>,
}

impl std::fmt::Debug for HmacUrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacUrlSigner").finish_non_exhaustive()
    }
}

impl HmacUrlSigner {
    pub fn new(key: impl AsRef<[u8]>) -> TesseraResult<Self> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(TesseraError::Configuration(
                "URL signing key must not be empty".into(),
            ));
        }
        Ok(Self { key: key.to_vec() })
    }

    fn mac(&self, canonical: &str) -> Result<HmacSha256, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| AuthError::Crypto(format!("hmac key: {e}")))?;
        mac.update(canonical.as_bytes());
        Ok(mac)
    }

    /// Sign with an explicit expiry instant.
    pub fn sign_until(
        &self,
        base_url: &str,
        params: &[(&str, &str)],
        expires_at: DateTime<Utc>,
    ) -> TesseraResult<String> {
        let mut url = Url::parse(base_url)
            .map_err(|e| TesseraError::Configuration(format!("invalid base URL: {e}")))?;

        let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        pairs.retain(|(k, _)| k != EXPIRES_PARAM && k != SIGNATURE_PARAM);
        pairs.extend(params.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        pairs.push((EXPIRES_PARAM.into(), expires_at.timestamp().to_string()));

        let canonical = Serializer::new(String::new()).extend_pairs(&pairs).finish();
        let signature = hex::encode(self.mac(&canonical)?.finalize().into_bytes());

        url.set_query(Some(&format!("{canonical}&{SIGNATURE_PARAM}={signature}")));
        Ok(url.into())
    }

    /// Check the signature and expiry of a signed URL and return its
    /// query parameters (without `expires` and `signature`).
    pub fn verify(&self, signed_url: &str, now: DateTime<Utc>) -> Result<Vec<(String, String)>, AuthError> {
        let url = Url::parse(signed_url)
            .map_err(|e| AuthError::TokenInvalid(format!("malformed URL: {e}")))?;

        let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let signature = match pairs.pop() {
            Some((k, v)) if k == SIGNATURE_PARAM => v,
            _ => return Err(AuthError::TokenInvalid("missing signature".into())),
        };
        let signature = hex::decode(signature)
            .map_err(|_| AuthError::TokenInvalid("malformed signature".into()))?;

        let canonical = Serializer::new(String::new()).extend_pairs(&pairs).finish();
        self.mac(&canonical)?
            .verify_slice(&signature)
            .map_err(|_| AuthError::TokenInvalid("signature mismatch".into()))?;

        let expires = pairs
            .iter()
            .find(|(k, _)| k == EXPIRES_PARAM)
            .and_then(|(_, v)| v.parse::<i64>().ok())
            .ok_or_else(|| AuthError::TokenInvalid("missing expiry".into()))?;
        if now.timestamp() >= expires {
            return Err(AuthError::TokenExpired);
        }

        pairs.retain(|(k, _)| k != EXPIRES_PARAM);
        Ok(pairs)
    }
}

impl UrlSigner for HmacUrlSigner {
    fn sign(&self, base_url: &str, params: &[(&str, &str)], ttl: Duration) -> TesseraResult<String> {
        self.sign_until(base_url, params, Utc::now() + ttl)
    }
}
