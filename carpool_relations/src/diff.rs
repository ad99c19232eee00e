//! `diff`: edges and matches whose two reservations are no longer peers,
//! plus the set of reservations whose aggregate stats need recomputing.

use crate::types::{CurrentState, RelationDiff, WantedPeers};

/// An edge or match between reservation owners `a` and `b` survives unless
/// a resolved peer set says otherwise. A reservation whose owner we never
/// resolved (outside the affected set) contributes no opinion, so the edge
/// is kept unless the *other* side's resolved peer set rejects it.
fn still_peers(want: &WantedPeers, a: i64, b: i64) -> bool {
    let mut known = false;
    let mut valid = true;

    if want.peers_by_user.contains_key(&a) {
        known = true;
        valid &= want.is_peer(a, b);
    }
    if want.peers_by_user.contains_key(&b) {
        known = true;
        valid &= want.is_peer(b, a);
    }

    !known || valid
}

pub fn make_diff(current: &CurrentState, want: &WantedPeers) -> RelationDiff {
    let mut diff = RelationDiff::default();

    for edge in &current.edges {
        let inviter_user = current.reservation_owner.get(&edge.inviter_reservation).copied();
        let invited_user = current.reservation_owner.get(&edge.invited_reservation).copied();

        diff.reservations_to_recompute.insert(edge.inviter_reservation);
        diff.reservations_to_recompute.insert(edge.invited_reservation);

        let Some(inviter_user) = inviter_user else { continue };
        let Some(invited_user) = invited_user else { continue };

        if !still_peers(want, inviter_user, invited_user) {
            diff.edges_to_delete.insert(edge.id);
        }
    }

    for m in &current.matches {
        let a = current.reservation_owner.get(&m.reservation_id).copied();
        let b = current.reservation_owner.get(&m.match_reservation_id).copied();

        diff.reservations_to_recompute.insert(m.reservation_id);
        diff.reservations_to_recompute.insert(m.match_reservation_id);

        let (Some(a), Some(b)) = (a, b) else { continue };

        if !still_peers(want, a, b) {
            diff.matches_to_delete.insert(m.id);
        }
    }

    diff
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use crate::types::Edge;

    use super::*;

    fn want_with(pairs: &[(i64, &[i64])]) -> WantedPeers {
        let mut peers_by_user = BTreeMap::new();
        for (user, peers) in pairs {
            peers_by_user.insert(*user, peers.iter().copied().collect::<BTreeSet<_>>());
        }
        WantedPeers { peers_by_user }
    }

    #[test]
    fn edge_between_former_peers_is_deleted() {
        let mut current = CurrentState::default();
        current.edges.push(Edge { id: 1, inviter_reservation: 10, invited_reservation: 20 });
        current.reservation_owner.insert(10, 1);
        current.reservation_owner.insert(20, 2);

        // user 1 left the group: their peer set no longer includes user 2.
        let want = want_with(&[(1, &[99])]);

        let diff = make_diff(&current, &want);
        assert!(diff.edges_to_delete.contains(&1));
        assert!(diff.reservations_to_recompute.contains(&10));
        assert!(diff.reservations_to_recompute.contains(&20));
    }

    #[test]
    fn edge_between_current_peers_survives() {
        let mut current = CurrentState::default();
        current.edges.push(Edge { id: 1, inviter_reservation: 10, invited_reservation: 20 });
        current.reservation_owner.insert(10, 1);
        current.reservation_owner.insert(20, 2);

        let want = want_with(&[(1, &[2])]);

        let diff = make_diff(&current, &want);
        assert!(diff.edges_to_delete.is_empty());
    }

    #[test]
    fn edge_with_no_resolved_owner_is_kept() {
        let mut current = CurrentState::default();
        current.edges.push(Edge { id: 1, inviter_reservation: 10, invited_reservation: 20 });
        current.reservation_owner.insert(10, 1);
        current.reservation_owner.insert(20, 2);

        // neither side of the edge was in the affected/resolved set.
        let want = WantedPeers::default();

        let diff = make_diff(&current, &want);
        assert!(diff.edges_to_delete.is_empty());
    }

    #[test]
    fn unresolvable_reservation_is_skipped_without_panic() {
        let mut current = CurrentState::default();
        current.edges.push(Edge { id: 1, inviter_reservation: 10, invited_reservation: 20 });
        current.reservation_owner.insert(10, 1);
        // owner of 20 unknown, e.g. it was deleted concurrently.

        let want = want_with(&[(1, &[2])]);

        let diff = make_diff(&current, &want);
        assert!(diff.edges_to_delete.is_empty());
        assert!(diff.reservations_to_recompute.contains(&10));
        assert!(diff.reservations_to_recompute.contains(&20));
    }
}
