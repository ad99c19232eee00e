//! `processCarpoolRelationForGroup`: reconciles stored invite/match edges
//! against the current peer graph after a group membership change.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl, scoped_futures::ScopedFutureExt};
use mega_carpool::MegaCarpoolResolver;
use portal_db::error::DbError;
use portal_db::pool::PgPool;
use portal_db::schema::group_members;

use crate::apply::apply_diff;
use crate::diff::make_diff;
use crate::error::CarpoolRelationError;
use crate::read::{read_current, reservations_for_users};
use crate::types::RelationDiff;
use crate::want::wanted_peers;

pub struct CarpoolRelationManager {
    pool: PgPool,
    resolver: MegaCarpoolResolver,
}

impl CarpoolRelationManager {
    pub fn new(pool: PgPool, resolver: MegaCarpoolResolver) -> Self {
        Self { pool, resolver }
    }

    /// Reconciles carpool relations for a group membership change.
    ///
    /// `user_id = Some(u)` scopes the reconciliation to the single member
    /// whose membership just changed (join/leave). `user_id = None` runs it
    /// for every member currently on record for `group_id`, used when the
    /// group itself is disabled.
    pub async fn process_carpool_relation_for_group(
        &self,
        group_id: i64,
        user_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<RelationDiff, CarpoolRelationError> {
        let mut conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let affected_users: Vec<i64> = match user_id {
            Some(u) => vec![u],
            None => {
                group_members::table
                    .filter(group_members::group_id.eq(group_id))
                    .select(group_members::user_id)
                    .distinct()
                    .load(&mut conn)
                    .await
                    .map_err(DbError::from)?
            }
        };

        if affected_users.is_empty() {
            return Ok(RelationDiff::default());
        }

        let reservation_ids = reservations_for_users(&mut conn, &affected_users).await?;
        if reservation_ids.is_empty() {
            return Ok(RelationDiff::default());
        }

        let current = read_current(&mut conn, &reservation_ids).await?;

        let owners: BTreeSet<i64> = affected_users.iter().copied().collect();
        let want = wanted_peers(&self.resolver, &owners).await?;

        let diff = make_diff(&current, &want);

        if diff.is_empty() {
            return Ok(diff);
        }

        conn.transaction::<_, CarpoolRelationError, _>(|conn| {
            let diff = &diff;
            async move {
                apply_diff(conn, diff, now).await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await?;

        Ok(diff)
    }
}
