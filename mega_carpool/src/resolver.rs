//! `getSameGroupUsers`: expand a user's active carpool groups across
//! enterprise boundaries via the mega-carpool federation mapping.

use std::collections::BTreeSet;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use portal_db::error::DbError;
use portal_db::pool::PgPool;
use portal_db::schema::{duo_groups, group_members};

use crate::error::MegaCarpoolError;
use crate::pool::MegaPool;
use crate::schema::mega_carpool_orgs;

pub struct MegaCarpoolResolver {
    portal_pool: PgPool,
    mega_pool: MegaPool,
}

impl MegaCarpoolResolver {
    pub fn new(portal_pool: PgPool, mega_pool: MegaPool) -> Self {
        Self { portal_pool, mega_pool }
    }

    /// Resolves every user who shares an active group with `user_id`,
    /// directly or through a mega-carpool enterprise federation. Degrades
    /// to primary-only peer resolution if the mega-carpool database is
    /// unreachable.
    pub async fn get_same_group_users(&self, user_id: i64) -> Result<Vec<i64>, MegaCarpoolError> {
        let mut conn = self.portal_pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

        let active_groups: Vec<(i64, Option<i64>)> = group_members::table
            .inner_join(duo_groups::table.on(duo_groups::id.eq(group_members::group_id)))
            .filter(group_members::user_id.eq(user_id))
            .filter(group_members::member_status.gt(1))
            .filter(duo_groups::disabled.eq(false))
            .select((duo_groups::id, duo_groups::enterprise_id))
            .load(&mut conn)
            .await
            .map_err(DbError::from)?;

        let direct_group_ids: BTreeSet<i64> = active_groups.iter().map(|(id, _)| *id).collect();
        let enterprise_ids: BTreeSet<i64> =
            active_groups.iter().filter_map(|(_, eid)| *eid).collect();

        let peer_enterprise_ids = self.expand_enterprises(&enterprise_ids).await;

        let mut group_query = duo_groups::table.filter(duo_groups::disabled.eq(false)).into_boxed();
        if peer_enterprise_ids.is_empty() {
            group_query = group_query.filter(duo_groups::id.eq_any(direct_group_ids.iter().copied().collect::<Vec<_>>()));
        } else {
            group_query = group_query.filter(
                duo_groups::id
                    .eq_any(direct_group_ids.iter().copied().collect::<Vec<_>>())
                    .or(duo_groups::enterprise_id.eq_any(peer_enterprise_ids.iter().copied().collect::<Vec<_>>())),
            );
        }

        let group_ids: Vec<i64> = group_query
            .select(duo_groups::id)
            .load(&mut conn)
            .await
            .map_err(DbError::from)?;

        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let user_ids: Vec<i64> = group_members::table
            .filter(group_members::group_id.eq_any(group_ids))
            .filter(group_members::member_status.gt(1))
            .select(group_members::user_id)
            .distinct()
            .load(&mut conn)
            .await
            .map_err(DbError::from)?;

        Ok(user_ids)
    }

    /// Looks up every enterprise sharing a mega cluster with the given
    /// ones. Returns the input set unchanged (degraded mode) if the
    /// mega-carpool database can't be reached.
    async fn expand_enterprises(&self, enterprise_ids: &BTreeSet<i64>) -> BTreeSet<i64> {
        if enterprise_ids.is_empty() {
            return BTreeSet::new();
        }

        let ids: Vec<i64> = enterprise_ids.iter().copied().collect();

        let result: Result<BTreeSet<i64>, DbError> = async {
            let mut conn = self.mega_pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;

            let mega_ids: Vec<i64> = mega_carpool_orgs::table
                .filter(mega_carpool_orgs::org_id.eq_any(&ids))
                .select(mega_carpool_orgs::mega_id)
                .load(&mut conn)
                .await
                .map_err(DbError::from)?;

            if mega_ids.is_empty() {
                return Ok(enterprise_ids.clone());
            }

            let peer_orgs: Vec<i64> = mega_carpool_orgs::table
                .filter(mega_carpool_orgs::mega_id.eq_any(mega_ids))
                .select(mega_carpool_orgs::org_id)
                .load(&mut conn)
                .await
                .map_err(DbError::from)?;

            let mut union = enterprise_ids.clone();
            union.extend(peer_orgs);
            Ok(union)
        }
        .await;

        match result {
            Ok(peers) => peers,
            Err(err) => {
                tracing::warn!(error = %err, "mega-carpool db unreachable, degraded mode: primary-only peers");
                enterprise_ids.clone()
            }
        }
    }
}
