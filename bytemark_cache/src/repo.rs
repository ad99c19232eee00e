//! Diesel-backed storage for the ticket cache, its change log, and refresh
//! log — typed document contracts over Postgres JSONB columns rather than
//! a second database technology.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use portal_db::error::DbError;
use portal_db::pool::PgPool;
use portal_db::schema::{
    bytemark_oauth_tokens, bytemark_ticket_refresh_log, bytemark_tickets_cache,
    bytemark_tickets_log,
};
use secrecy::SecretString;

use crate::error::CacheError;
use crate::types::{PassEntry, TicketsCache};

pub struct CacheRepo {
    pool: PgPool,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = bytemark_tickets_cache)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct CacheRow {
    #[allow(dead_code)]
    id: i64,
    user_id: i64,
    ts: i64,
    passes: serde_json::Value,
    passes4: serde_json::Value,
}

impl CacheRow {
    fn into_domain(self) -> Result<TicketsCache, CacheError> {
        let passes: Vec<PassEntry> = serde_json::from_value(self.passes)
            .map_err(|e| CacheError::Malformed(e.to_string()))?;
        let passes4: Vec<PassEntry> = serde_json::from_value(self.passes4)
            .map_err(|e| CacheError::Malformed(e.to_string()))?;
        Ok(TicketsCache { user_id: self.user_id, timestamp: self.ts, passes, passes4 })
    }
}

impl CacheRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn load_oauth_token(&self, user_id: i64) -> Result<Option<SecretString>, CacheError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let token: Option<String> = bytemark_oauth_tokens::table
            .filter(bytemark_oauth_tokens::user_id.eq(user_id))
            .select(bytemark_oauth_tokens::token)
            .first(&mut conn)
            .await
            .optional()
            .map_err(DbError::from)?;

        Ok(token.map(SecretString::from))
    }

    /// All `user_id`s with an on-file OAuth token, for `buildCacheIfEmpty`'s
    /// bootstrap sweep.
    pub async fn users_with_oauth_tokens(&self) -> Result<Vec<i64>, CacheError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        bytemark_oauth_tokens::table
            .select(bytemark_oauth_tokens::user_id)
            .load(&mut conn)
            .await
            .map_err(|e| CacheError::Db(DbError::from(e)))
    }

    pub async fn cache_count(&self) -> Result<i64, CacheError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        bytemark_tickets_cache::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|e| CacheError::Db(DbError::from(e)))
    }

    pub async fn load_cache(&self, user_id: i64) -> Result<Option<TicketsCache>, CacheError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let row: Option<CacheRow> = bytemark_tickets_cache::table
            .filter(bytemark_tickets_cache::user_id.eq(user_id))
            .select(CacheRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(DbError::from)?;

        row.map(CacheRow::into_domain).transpose()
    }

    /// Upserts the cache document keyed by `user_id`.
    pub async fn upsert_cache(&self, cache: &TicketsCache) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let passes = serde_json::to_value(&cache.passes)
            .map_err(|e| CacheError::Malformed(e.to_string()))?;
        let passes4 = serde_json::to_value(&cache.passes4)
            .map_err(|e| CacheError::Malformed(e.to_string()))?;

        diesel::insert_into(bytemark_tickets_cache::table)
            .values((
                bytemark_tickets_cache::user_id.eq(cache.user_id),
                bytemark_tickets_cache::ts.eq(cache.timestamp),
                bytemark_tickets_cache::passes.eq(&passes),
                bytemark_tickets_cache::passes4.eq(&passes4),
            ))
            .on_conflict(bytemark_tickets_cache::user_id)
            .do_update()
            .set((
                bytemark_tickets_cache::ts.eq(cache.timestamp),
                bytemark_tickets_cache::passes.eq(&passes),
                bytemark_tickets_cache::passes4.eq(&passes4),
            ))
            .execute(&mut conn)
            .await
            .map_err(|e| CacheError::Db(DbError::from(e)))?;

        Ok(())
    }

    /// Appends a refresh-event row.
    pub async fn write_refresh_log(
        &self,
        user_id: i64,
        ts: i64,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        diesel::insert_into(bytemark_ticket_refresh_log::table)
            .values((
                bytemark_ticket_refresh_log::user_id.eq(user_id),
                bytemark_ticket_refresh_log::ts.eq(ts),
                bytemark_ticket_refresh_log::created_on.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map_err(|e| CacheError::Db(DbError::from(e)))?;

        Ok(())
    }

    /// Appends one log row per observed pass entry.
    pub async fn write_pass_logs(
        &self,
        user_id: i64,
        entries: &[PassEntry],
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let rows: Vec<_> = entries
            .iter()
            .map(|entry| {
                (
                    bytemark_tickets_log::user_id.eq(user_id),
                    bytemark_tickets_log::pass_uuid.eq(entry.pass_uuid.clone()),
                    bytemark_tickets_log::ts.eq(entry.timestamp),
                    bytemark_tickets_log::status.eq(entry.status.clone()),
                    bytemark_tickets_log::free_ticket_status.eq(entry.free_ticket_status),
                    bytemark_tickets_log::payload.eq(entry.payload.clone()),
                    bytemark_tickets_log::payload_hash.eq(entry.payload_hash.clone()),
                    bytemark_tickets_log::logged_on.eq(now),
                )
            })
            .collect();

        diesel::insert_into(bytemark_tickets_log::table)
            .values(rows)
            .execute(&mut conn)
            .await
            .map_err(|e| CacheError::Db(DbError::from(e)))?;

        Ok(())
    }
}
