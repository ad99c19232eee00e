use std::collections::{BTreeMap, BTreeSet};

/// A `DuoReservation` edge: `inviter_reservation` sent an invite to
/// `invited_reservation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Edge {
    pub id: i64,
    pub inviter_reservation: i64,
    pub invited_reservation: i64,
}

/// A `MatchStatistic` row linking two reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchRow {
    pub id: i64,
    pub reservation_id: i64,
    pub match_reservation_id: i64,
}

/// Desired state: for each reservation owner touched by the relation change,
/// the peer set they're still allowed to carpool with.
#[derive(Debug, Default)]
pub struct WantedPeers {
    pub peers_by_user: BTreeMap<i64, BTreeSet<i64>>,
}

impl WantedPeers {
    pub fn is_peer(&self, user_id: i64, candidate: i64) -> bool {
        self.peers_by_user
            .get(&user_id)
            .map(|peers| peers.contains(&candidate))
            .unwrap_or(false)
    }
}

/// Current state read from the DB: edges and matches touching the affected
/// reservations, plus the owning user of every reservation involved so the
/// diff stage doesn't need to re-query.
#[derive(Debug, Default)]
pub struct CurrentState {
    pub edges: Vec<Edge>,
    pub matches: Vec<MatchRow>,
    pub reservation_owner: BTreeMap<i64, i64>,
}

/// What must change to reconcile stored relations with the current peer
/// graph: edges and matches referencing a reservation that is no longer a
/// peer, plus the full set of reservations whose aggregate `ReservationMatch`
/// stats need recomputation afterward.
#[derive(Debug, Default)]
pub struct RelationDiff {
    pub edges_to_delete: BTreeSet<i64>,
    pub matches_to_delete: BTreeSet<i64>,
    pub reservations_to_recompute: BTreeSet<i64>,
}

impl RelationDiff {
    pub fn is_empty(&self) -> bool {
        self.edges_to_delete.is_empty() && self.matches_to_delete.is_empty()
    }
}
