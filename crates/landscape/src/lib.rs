//! # Landscape
//!
//! Answers two questions for a peer-to-peer log-replication node:
//!
//! - which boards a participant is responsible for, and
//! - which participants hold the logs of a board,
//!
//! and streams topology change notifications to interested subscribers.
//!
//! ## Architecture
//!
//! - **Identity:** Ed25519 key material → peer id + `/p2p` addresses
//! - **Topology:** static board ↔ holder tables, read-only after construction
//! - **Subscriptions:** cancellable, board-filtered views over the event bus
//! - **Service:** [`Landscape`] wires the above from a [`LandscapeConfig`]
//!
//! ## Example
//!
//! ```rust
//! use landscape::{Landscape, LandscapeConfig};
//!
//! let landscape = Landscape::new(LandscapeConfig::cut_corners()).unwrap();
//! landscape.start();
//!
//! let peers = landscape.bootstrap_peers();
//! assert_eq!(peers.len(), 4);
//!
//! let own = landscape.private_key(0).unwrap().peer_id();
//! assert!(landscape.partitions_for(&own).unwrap().contains(landscape.board()));
//!
//! landscape.stop();
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod error;
pub mod identity;
pub mod landscape;
pub mod subscription;
pub mod topology;

pub use config::LandscapeConfig;
pub use error::{ConfigError, IdentityError, LandscapeError, Result, TopologyError};
pub use identity::{Identity, IdentityRegistry, KeyPair};
pub use landscape::Landscape;
pub use subscription::{
    with_boards, Subscription, SubscriptionFilter, SubscriptionManager, SubscriptionOption,
    SubscriptionState,
};
pub use topology::TopologyTable;

pub use landscape_bus::{BusEnvelope, EventBus, EventPublisher};
pub use landscape_types::{BoardId, LandscapeEvent, MembershipChange, Multiaddr, PeerAddrInfo, PeerId};
