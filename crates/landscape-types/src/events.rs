//! # Landscape Events
//!
//! Topology notifications that flow over the landscape bus. Every event names
//! the board it concerns so subscribers can filter by board.

use crate::board::BoardId;
use crate::peer::PeerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembershipChange {
    Joined,
    Left,
}

impl fmt::Display for MembershipChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Joined => f.write_str("joined"),
            Self::Left => f.write_str("left"),
        }
    }
}

/// A change relevant to one board.
///
/// Produced by the replication/transport collaborators and published onto
/// the bus; the landscape itself never originates events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LandscapeEvent {
    /// A holder joined or left the board.
    MembershipChanged {
        board: BoardId,
        peer: PeerId,
        change: MembershipChange,
    },

    /// A new log source was discovered on the board.
    SourceDiscovered { board: BoardId, peer: PeerId },
}

impl LandscapeEvent {
    /// Board this event concerns (for filtering).
    #[must_use]
    pub fn board_id(&self) -> &BoardId {
        match self {
            Self::MembershipChanged { board, .. } | Self::SourceDiscovered { board, .. } => board,
        }
    }

    /// Peer this event is about.
    #[must_use]
    pub fn peer_id(&self) -> &PeerId {
        match self {
            Self::MembershipChanged { peer, .. } | Self::SourceDiscovered { peer, .. } => peer,
        }
    }

    /// Short, stable name for log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MembershipChanged { .. } => "membership_changed",
            Self::SourceDiscovered { .. } => "source_discovered",
        }
    }
}
