//! `read`: the actual `DuoReservation`/`MatchStatistic` graph currently
//! stored for a set of reservations.

use std::collections::BTreeSet;

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use portal_db::error::DbError;
use portal_db::schema::{duo_reservations, match_statistics, reservations};

use crate::types::{CurrentState, Edge, MatchRow};

/// Reservation ids currently owned by `user_ids`, regardless of status —
/// invitation and match edges can reference a reservation that has since
/// moved past `SEARCHING`, and those stale edges still need cleaning up.
pub async fn reservations_for_users(
    conn: &mut AsyncPgConnection,
    user_ids: &[i64],
) -> Result<Vec<i64>, DbError> {
    let ids = reservations::table
        .filter(reservations::user_id.eq_any(user_ids))
        .select(reservations::id)
        .load(conn)
        .await?;
    Ok(ids)
}

/// Loads every edge and match touching `reservation_ids`, then resolves the
/// owning user of every reservation referenced on either side so the diff
/// stage can check peer membership without further queries.
pub async fn read_current(
    conn: &mut AsyncPgConnection,
    reservation_ids: &[i64],
) -> Result<CurrentState, DbError> {
    let edge_rows: Vec<(i64, i64, i64)> = duo_reservations::table
        .filter(
            duo_reservations::reservation_id
                .eq_any(reservation_ids)
                .or(duo_reservations::offer_id.eq_any(reservation_ids)),
        )
        .select((duo_reservations::id, duo_reservations::reservation_id, duo_reservations::offer_id))
        .load(conn)
        .await?;

    let match_rows: Vec<(i64, i64, i64)> = match_statistics::table
        .filter(
            match_statistics::reservation_id
                .eq_any(reservation_ids)
                .or(match_statistics::match_reservation_id.eq_any(reservation_ids)),
        )
        .select((
            match_statistics::id,
            match_statistics::reservation_id,
            match_statistics::match_reservation_id,
        ))
        .load(conn)
        .await?;

    let edges: Vec<Edge> = edge_rows
        .into_iter()
        .map(|(id, inviter_reservation, invited_reservation)| Edge {
            id,
            inviter_reservation,
            invited_reservation,
        })
        .collect();

    let matches: Vec<MatchRow> = match_rows
        .into_iter()
        .map(|(id, reservation_id, match_reservation_id)| MatchRow {
            id,
            reservation_id,
            match_reservation_id,
        })
        .collect();

    let mut touched: BTreeSet<i64> = reservation_ids.iter().copied().collect();
    for e in &edges {
        touched.insert(e.inviter_reservation);
        touched.insert(e.invited_reservation);
    }
    for m in &matches {
        touched.insert(m.reservation_id);
        touched.insert(m.match_reservation_id);
    }

    let touched: Vec<i64> = touched.into_iter().collect();
    let owner_rows: Vec<(i64, i64)> = reservations::table
        .filter(reservations::id.eq_any(&touched))
        .select((reservations::id, reservations::user_id))
        .load(conn)
        .await?;

    Ok(CurrentState { edges, matches, reservation_owner: owner_rows.into_iter().collect() })
}
