//! # Landscape Types
//!
//! Shared vocabulary of the landscape subsystem.
//!
//! ## Clusters
//!
//! - **Boards**: `BoardId`
//! - **Peers**: `PeerId`, `PeerAddrInfo`
//! - **Addresses**: `Multiaddr`, `Protocol`
//! - **Events**: `LandscapeEvent`, `MembershipChange`

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod board;
pub mod errors;
pub mod events;
pub mod multiaddr;
pub mod peer;

pub use board::BoardId;
pub use errors::{AddrParseError, PeerIdParseError};
pub use events::{LandscapeEvent, MembershipChange};
pub use multiaddr::{Multiaddr, Protocol};
pub use peer::{PeerAddrInfo, PeerId, PEER_ID_LEN};
