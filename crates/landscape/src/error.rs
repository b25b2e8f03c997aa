//! # Error Types
//!
//! Construction-time errors (`IdentityError`, `ConfigError`) abort startup;
//! query-time errors (`TopologyError`) go back to the caller. Lifecycle
//! violations on a delivery path end only the affected subscription.

use landscape_bus::BusError;
use landscape_types::{AddrParseError, BoardId, PeerId};
use thiserror::Error;

/// Result type alias for the landscape crate.
pub type Result<T> = std::result::Result<T, LandscapeError>;

/// Errors deriving identities and their addresses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The key material cannot be decoded or is not an Ed25519 key.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// The local address hint is not a usable network address.
    #[error("cannot resolve address {hint:?}: {source}")]
    AddressResolution {
        hint: String,
        #[source]
        source: AddrParseError,
    },

    /// The hint already names a different peer.
    #[error("address {hint:?} belongs to peer {found}, not {expected}")]
    ForeignPeerAddress {
        hint: String,
        expected: PeerId,
        found: PeerId,
    },
}

/// Errors answering topology queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// The identity is not part of the configured membership.
    #[error("unknown identity: {0}")]
    UnknownIdentity(PeerId),

    /// No member index `index` (membership has `len` members).
    #[error("member index {index} out of range (membership size {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The board is not configured.
    #[error("unknown partition: {0}")]
    UnknownPartition(BoardId),

    /// A configured board would have no holders.
    #[error("partition {0} has no holders")]
    EmptyPartition(BoardId),
}

/// Configuration errors. All are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// `private_keys` and `local_addrs` differ in length.
    #[error("membership mismatch: {keys} private keys but {addrs} local addresses")]
    MembershipMismatch { keys: usize, addrs: usize },

    #[error("membership is empty")]
    EmptyMembership,

    #[error("board id is empty")]
    EmptyBoard,

    /// A capacity setting is zero.
    #[error("{0} must be greater than zero")]
    ZeroCapacity(&'static str),
}

/// Umbrella error of the landscape crate.
#[derive(Debug, Error)]
pub enum LandscapeError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A listener delivered something a subscription cannot accept.
    #[error("listener {listener} lifecycle violation: {source}")]
    ListenerLifecycle {
        listener: u64,
        #[source]
        source: BusError,
    },
}
