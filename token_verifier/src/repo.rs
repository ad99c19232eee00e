//! Diesel-backed lookups backing the verifier protocol: auth user
//! existence, block status, and the active access-token row.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl, scoped_futures::ScopedFutureExt};
use portal_db::error::DbError;
use portal_db::pool::PgPool;
use portal_db::schema::{auth_user_tokens, auth_users, block_users};

use crate::error::TokenError;
use crate::types::MintedAccessToken;

pub struct AuthRepo {
    pool: PgPool,
}

impl AuthRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fails `TokenFailed` if no `AuthUser` row exists for this id.
    pub async fn require_user_exists(&self, user_id: i64) -> Result<(), TokenError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let exists: Option<i64> = auth_users::table
            .filter(auth_users::id.eq(user_id))
            .select(auth_users::id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(DbError::from)?;

        exists.map(|_| ()).ok_or(TokenError::TokenFailed)
    }

    /// Any non-deleted `BlockUser` row blocks the user here, independent of
    /// `block_type` — that finer distinction belongs to the ledger's coin
    /// suspension check, not general authentication.
    pub async fn is_blocked(&self, user_id: i64) -> Result<bool, TokenError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let count: i64 = block_users::table
            .filter(block_users::user_id.eq(user_id))
            .filter(block_users::is_deleted.eq(false))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(DbError::from)?;

        Ok(count > 0)
    }

    /// Loads the `AuthUserToken` row for this access token string, failing
    /// `TokenFailed` if missing or disabled.
    pub async fn require_active_token(
        &self,
        access_token: &str,
    ) -> Result<(i64, DateTime<Utc>), TokenError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let row: Option<(i64, bool, DateTime<Utc>)> = auth_user_tokens::table
            .filter(auth_user_tokens::access_token.eq(access_token))
            .select((
                auth_user_tokens::user_id,
                auth_user_tokens::disabled,
                auth_user_tokens::expires_on,
            ))
            .first(&mut conn)
            .await
            .optional()
            .map_err(DbError::from)?;

        match row {
            Some((user_id, false, expires_on)) => Ok((user_id, expires_on)),
            _ => Err(TokenError::TokenFailed),
        }
    }

    /// Mints and persists a replacement token, disabling the old one, in a
    /// single transaction.
    pub async fn rotate_token(
        &self,
        user_id: i64,
        old_access_token: &str,
        minted: MintedAccessToken,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        conn.transaction::<_, DbError, _>(|conn| {
            async move {
                diesel::update(
                    auth_user_tokens::table
                        .filter(auth_user_tokens::access_token.eq(old_access_token)),
                )
                .set(auth_user_tokens::disabled.eq(true))
                .execute(conn)
                .await?;

                diesel::insert_into(auth_user_tokens::table)
                    .values((
                        auth_user_tokens::user_id.eq(user_id),
                        auth_user_tokens::access_token.eq(&minted.token),
                        auth_user_tokens::disabled.eq(false),
                        auth_user_tokens::created_on.eq(now),
                        auth_user_tokens::expires_on.eq(minted.expires_on),
                    ))
                    .execute(conn)
                    .await?;

                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(TokenError::from)
    }
}
