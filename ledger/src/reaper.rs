//! Maintenance reaper: `clearOldPendingPt`.
//!
//! Called on an interval by `system_manager`, not a hidden side effect of
//! any request-path operation.

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use portal_db::error::DbError;
use portal_db::pool::PgPool;
use portal_db::schema::{block_users, points_transactions};

use crate::error::LedgerError;

pub struct ReaperRepo {
    pool: PgPool,
}

impl ReaperRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// For points_transactions older than 24h with activity in {9, 10} for
    /// a non-blocked user, rewrites activity to 8. Returns the row count
    /// updated.
    pub async fn clear_old_pending_pt(&self, now: DateTime<Utc>) -> Result<usize, LedgerError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        let cutoff = now - Duration::hours(24);

        let blocked_user_ids: Vec<i64> = block_users::table
            .filter(block_users::is_deleted.eq(false))
            .filter(block_users::block_type.eq(1))
            .select(block_users::user_id)
            .load(&mut conn)
            .await
            .map_err(DbError::from)?;

        let updated = diesel::update(
            points_transactions::table
                .filter(points_transactions::activity_type.eq_any([9, 10]))
                .filter(points_transactions::created_on.le(cutoff))
                .filter(diesel::dsl::not(
                    points_transactions::user_id.eq_any(blocked_user_ids),
                )),
        )
        .set(points_transactions::activity_type.eq(8))
        .execute(&mut conn)
        .await
        .map_err(DbError::from)?;

        Ok(updated)
    }
}
