//! # Error Types
//!
//! Parse errors for identifiers and addresses.

use thiserror::Error;

/// Errors produced while parsing a `PeerId` from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerIdParseError {
    /// The text is not valid hex.
    #[error("peer id is not valid hex: {0}")]
    InvalidHex(String),

    /// The decoded digest has the wrong length.
    #[error("peer id has wrong length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Errors produced while parsing a `Multiaddr` from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddrParseError {
    /// The address string is empty.
    #[error("empty address")]
    Empty,

    /// Addresses must start with `/`.
    #[error("address must start with '/': {0}")]
    MissingLeadingSlash(String),

    /// A segment names a protocol this crate does not understand.
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),

    /// A protocol segment is not followed by its value.
    #[error("protocol {0} is missing its value")]
    MissingValue(String),

    /// A protocol value failed to parse.
    #[error("invalid value {value:?} for protocol {protocol}")]
    InvalidValue { protocol: String, value: String },

    /// The address does not end in a `/p2p/<peer>` component.
    #[error("address has no /p2p component: {0}")]
    MissingPeerId(String),
}
