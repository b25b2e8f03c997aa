//! # Topology Table
//!
//! Static board → holders mapping plus the inverse peer → boards index.
//! Built once from the identity registry and read-only afterwards, so
//! lookups take `&self` and need no locking.
//!
//! ## Invariants
//!
//! - Every holder is a registered identity.
//! - Every configured board has at least one holder, and every holder has at
//!   least one address, so `addresses_for` never returns an empty list for a
//!   configured board.

use crate::error::TopologyError;
use crate::identity::IdentityRegistry;
use landscape_types::{BoardId, Multiaddr, PeerAddrInfo, PeerId};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TopologyTable {
    /// Holders per board, in configuration order, without duplicates.
    holders: HashMap<BoardId, Vec<PeerId>>,

    /// Inverse index.
    assignments: HashMap<PeerId, BTreeSet<BoardId>>,

    /// Every registered member, assigned or not.
    members: HashSet<PeerId>,

    /// Transport addresses per member.
    addrs: HashMap<PeerId, Vec<Multiaddr>>,
}

impl TopologyTable {
    /// Build a table from explicit board assignments.
    ///
    /// # Errors
    ///
    /// - `UnknownIdentity` if a holder is not in the registry
    /// - `EmptyPartition` if a board has no holders, or a holder has no
    ///   address to dial
    pub fn new<I>(registry: &IdentityRegistry, assignments: I) -> Result<Self, TopologyError>
    where
        I: IntoIterator<Item = (BoardId, Vec<PeerId>)>,
    {
        let members: HashSet<PeerId> = registry.iter().map(|identity| identity.peer_id()).collect();
        let addrs: HashMap<PeerId, Vec<Multiaddr>> = registry
            .addr_infos()
            .into_iter()
            .map(|info| (info.peer_id, info.addrs))
            .collect();

        let mut holders: HashMap<BoardId, Vec<PeerId>> = HashMap::new();
        let mut inverse: HashMap<PeerId, BTreeSet<BoardId>> = HashMap::new();

        for (board, peers) in assignments {
            let entry = holders.entry(board.clone()).or_default();
            for peer in peers {
                if !members.contains(&peer) {
                    return Err(TopologyError::UnknownIdentity(peer));
                }
                if addrs.get(&peer).map_or(true, Vec::is_empty) {
                    return Err(TopologyError::EmptyPartition(board));
                }
                if !entry.contains(&peer) {
                    entry.push(peer);
                }
                inverse.entry(peer).or_default().insert(board.clone());
            }
            if entry.is_empty() {
                return Err(TopologyError::EmptyPartition(board));
            }
            debug!(board = %board, holders = entry.len(), "Board configured");
        }

        Ok(Self {
            holders,
            assignments: inverse,
            members,
            addrs,
        })
    }

    /// One board held by every registered member.
    pub fn single_board(
        registry: &IdentityRegistry,
        board: BoardId,
    ) -> Result<Self, TopologyError> {
        Self::new(registry, [(board, registry.peer_ids())])
    }

    /// Boards assigned to `peer`. Empty for a member without assignments.
    pub fn partitions_for(&self, peer: &PeerId) -> Result<BTreeSet<BoardId>, TopologyError> {
        if !self.members.contains(peer) {
            return Err(TopologyError::UnknownIdentity(*peer));
        }
        Ok(self.assignments.get(peer).cloned().unwrap_or_default())
    }

    /// Holders of `board`, in configuration order.
    pub fn holders_of(&self, board: &BoardId) -> Result<&[PeerId], TopologyError> {
        self.holders
            .get(board)
            .map(Vec::as_slice)
            .ok_or_else(|| TopologyError::UnknownPartition(board.clone()))
    }

    /// Dialable address records of the holders of `board`.
    pub fn addresses_for(&self, board: &BoardId) -> Result<Vec<PeerAddrInfo>, TopologyError> {
        let holders = self.holders_of(board)?;
        let infos: Vec<PeerAddrInfo> = holders
            .iter()
            .filter_map(|peer| {
                self.addrs
                    .get(peer)
                    .map(|addrs| PeerAddrInfo::new(*peer, addrs.clone()))
            })
            .collect();
        debug_assert_eq!(infos.len(), holders.len());
        Ok(infos)
    }

    /// Whether `board` is configured.
    #[must_use]
    pub fn contains_board(&self, board: &BoardId) -> bool {
        self.holders.contains_key(board)
    }

    /// Configured boards, sorted.
    #[must_use]
    pub fn boards(&self) -> BTreeSet<BoardId> {
        self.holders.keys().cloned().collect()
    }
}
