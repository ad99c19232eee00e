//! `want`: the peer graph a reservation owner is currently entitled to,
//! resolved through [`mega_carpool::MegaCarpoolResolver`].

use std::collections::BTreeSet;

use mega_carpool::MegaCarpoolResolver;

use crate::error::CarpoolRelationError;
use crate::types::WantedPeers;

/// Resolves the peer set of every user in `owners` and returns the union as
/// a [`WantedPeers`] lookup table.
pub async fn wanted_peers(
    resolver: &MegaCarpoolResolver,
    owners: &BTreeSet<i64>,
) -> Result<WantedPeers, CarpoolRelationError> {
    let mut peers_by_user = std::collections::BTreeMap::new();

    for &owner in owners {
        let peers = resolver.get_same_group_users(owner).await?;
        peers_by_user.insert(owner, peers.into_iter().collect());
    }

    Ok(WantedPeers { peers_by_user })
}
