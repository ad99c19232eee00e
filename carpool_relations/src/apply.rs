//! `apply`: delete the rejected edges/matches and recompute the
//! `ReservationMatch` aggregate for every touched reservation, inside a
//! single transaction.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use portal_db::error::DbError;
use portal_db::schema::{duo_reservations, match_statistics, reservation_matches};

use crate::types::RelationDiff;

pub async fn apply_diff(
    conn: &mut AsyncPgConnection,
    diff: &RelationDiff,
    now: DateTime<Utc>,
) -> Result<(), DbError> {
    if !diff.edges_to_delete.is_empty() {
        let ids: Vec<i64> = diff.edges_to_delete.iter().copied().collect();
        diesel::delete(duo_reservations::table.filter(duo_reservations::id.eq_any(ids)))
            .execute(conn)
            .await?;
        tracing::debug!(count = diff.edges_to_delete.len(), "removed stale carpool invite edges");
    }

    if !diff.matches_to_delete.is_empty() {
        let ids: Vec<i64> = diff.matches_to_delete.iter().copied().collect();
        diesel::delete(match_statistics::table.filter(match_statistics::id.eq_any(ids)))
            .execute(conn)
            .await?;
        tracing::debug!(count = diff.matches_to_delete.len(), "removed stale carpool match rows");
    }

    for &reservation_id in &diff.reservations_to_recompute {
        recompute_reservation_match(conn, reservation_id, now).await?;
    }

    Ok(())
}

async fn recompute_reservation_match(
    conn: &mut AsyncPgConnection,
    reservation_id: i64,
    now: DateTime<Utc>,
) -> Result<(), DbError> {
    let invite_sent: i64 = duo_reservations::table
        .filter(duo_reservations::reservation_id.eq(reservation_id))
        .count()
        .get_result(conn)
        .await?;

    let invite_received: i64 = duo_reservations::table
        .filter(duo_reservations::offer_id.eq(reservation_id))
        .count()
        .get_result(conn)
        .await?;

    let matches: i64 = match_statistics::table
        .filter(
            match_statistics::reservation_id
                .eq(reservation_id)
                .or(match_statistics::match_reservation_id.eq(reservation_id)),
        )
        .count()
        .get_result(conn)
        .await?;

    diesel::insert_into(reservation_matches::table)
        .values((
            reservation_matches::reservation_id.eq(reservation_id),
            reservation_matches::invite_sent.eq(invite_sent as i32),
            reservation_matches::invite_received.eq(invite_received as i32),
            reservation_matches::matches.eq(matches as i32),
            reservation_matches::modified_on.eq(now),
        ))
        .on_conflict(reservation_matches::reservation_id)
        .do_update()
        .set((
            reservation_matches::invite_sent.eq(invite_sent as i32),
            reservation_matches::invite_received.eq(invite_received as i32),
            reservation_matches::matches.eq(matches as i32),
            reservation_matches::modified_on.eq(now),
        ))
        .execute(conn)
        .await?;

    Ok(())
}
