//! SurrealDB implementation of [`UserTokenRepository`].
//!
//! Tokens are stored by SHA-256 digest and looked up through the unique
//! `idx_user_token_hash` index. Rows are only ever revoked here; the
//! user delete cascade is the one path that removes them.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tessera_core::error::TesseraResult;
use tessera_core::models::user_token::{CreateUserToken, UserToken, UserTokenType};
use tessera_core::repository::{RedeemPasswordReset, UserTokenRepository};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct UserTokenRow {
    record_id: String,
    tenant_id: String,
    user_id: String,
    token_type: String,
    token_hash: String,
    expires_at: Option<DateTime<Utc>>,
    revoked: bool,
    created_at: DateTime<Utc>,
}

impl UserTokenRow {
    fn try_into_token(self) -> Result<UserToken, DbError> {
        let token_type = UserTokenType::parse(&self.token_type)
            .ok_or_else(|| DbError::Decode(format!("unknown token type: {}", self.token_type)))?;
        Ok(UserToken {
            id: parse_uuid("user_token", &self.record_id)?,
            tenant_id: parse_uuid("tenant", &self.tenant_id)?,
            user_id: parse_uuid("user", &self.user_id)?,
            token_type,
            token_hash: self.token_hash,
            expires_at: self.expires_at,
            revoked: self.revoked,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct PasswordHashRow {
    password_hash: Option<String>,
}

/// SurrealDB implementation of the UserToken repository.
#[derive(Clone)]
pub struct SurrealUserTokenRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserTokenRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn get_by_id(&self, id: &str) -> Result<UserToken, DbError> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('user_token', $id)")
            .bind(("id", id.to_string()))
            .await?;

        let rows: Vec<UserTokenRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound {
                entity: "user_token".into(),
                id: id.to_string(),
            })?
            .try_into_token()
    }
}

impl<C: Connection> UserTokenRepository for SurrealUserTokenRepository<C> {
    async fn issue(&self, input: CreateUserToken) -> TesseraResult<UserToken> {
        let id_str = Uuid::new_v4().to_string();

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE user_token SET revoked = true \
                 WHERE user_id = $user_id AND token_type = $token_type \
                 AND revoked = false AND tenant_id = $tenant_id; \
                 CREATE type::record('user_token', $id) SET \
                 tenant_id = $tenant_id, user_id = $user_id, \
                 token_type = $token_type, token_hash = $token_hash, \
                 expires_at = $expires_at, revoked = false; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("token_type", input.token_type.as_str().to_string()))
            .bind(("token_hash", input.token_hash))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(self.get_by_id(&id_str).await?)
    }

    async fn find_by_hash(
        &self,
        token_type: UserTokenType,
        token_hash: &str,
    ) -> TesseraResult<Option<UserToken>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user_token \
                 WHERE token_hash = $token_hash AND token_type = $token_type \
                 LIMIT 1",
            )
            .bind(("token_hash", token_hash.to_string()))
            .bind(("token_type", token_type.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserTokenRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(UserTokenRow::try_into_token)
            .transpose()?)
    }

    async fn list_live(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        token_type: UserTokenType,
    ) -> TesseraResult<Vec<UserToken>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user_token \
                 WHERE user_id = $user_id AND token_type = $token_type \
                 AND revoked = false AND tenant_id = $tenant_id \
                 ORDER BY created_at ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("token_type", token_type.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserTokenRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(UserTokenRow::try_into_token)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn redeem_password_reset(&self, input: RedeemPasswordReset) -> TesseraResult<()> {
        let token_id = input.token_id.to_string();
        let user_id = input.user_id.to_string();
        let tenant_id = input.tenant_id.to_string();

        // The claim only matches while the token is live, so of two
        // concurrent redemptions exactly one writes the password.
        let committed = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 LET $claimed = (UPDATE type::record('user_token', $token_id) \
                     SET revoked = true \
                     WHERE revoked = false AND user_id = $user_id \
                     AND tenant_id = $tenant_id); \
                 IF array::len($claimed) > 0 { \
                     UPDATE type::record('user', $user_id) \
                         SET password_hash = $password_hash, updated_at = time::now() \
                         WHERE tenant_id = $tenant_id; \
                     UPDATE user_token SET revoked = true \
                         WHERE user_id = $user_id AND token_type = $token_type \
                         AND revoked = false AND tenant_id = $tenant_id; \
                 }; \
                 COMMIT TRANSACTION;",
            )
            .bind(("token_id", token_id.clone()))
            .bind(("user_id", user_id.clone()))
            .bind(("tenant_id", tenant_id.clone()))
            .bind(("password_hash", input.password_hash.clone()))
            .bind((
                "token_type",
                UserTokenType::PasswordReset.as_str().to_string(),
            ))
            .await
            .and_then(|response| response.check());

        // A loser of the optimistic write conflict sees its transaction
        // aborted rather than an empty claim.
        if let Err(e) = committed {
            if self.get_by_id(&token_id).await?.revoked {
                debug!(token_id = %token_id, error = %e, "Redemption lost to a concurrent claim");
                return Err(DbError::Conflict(format!("user token {token_id} already redeemed")).into());
            }
            return Err(DbError::from(e).into());
        }

        // Salted hashes are unique, so the stored hash tells whether this
        // call's claim won.
        let mut result = self
            .db
            .query(
                "SELECT password_hash FROM type::record('user', $user_id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("user_id", user_id))
            .bind(("tenant_id", tenant_id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PasswordHashRow> = result.take(0).map_err(DbError::from)?;
        let stored = rows.into_iter().next().and_then(|r| r.password_hash);
        if stored.as_deref() != Some(input.password_hash.as_str()) {
            return Err(DbError::Conflict(format!("user token {token_id} already redeemed")).into());
        }

        Ok(())
    }
}
