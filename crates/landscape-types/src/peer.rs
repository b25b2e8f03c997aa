//! # Peer Identities
//!
//! A `PeerId` is the SHA-256 digest of a participant's Ed25519 public key.
//! It is rendered as lowercase hex so it can travel inside `/p2p/<peer>`
//! address components and be parsed back.

use crate::errors::{AddrParseError, PeerIdParseError};
use crate::multiaddr::{Multiaddr, Protocol};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of a peer id digest in bytes.
pub const PEER_ID_LEN: usize = 32;

/// Stable identifier of a network participant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId([u8; PEER_ID_LEN]);

impl PeerId {
    /// Wrap an already computed public-key digest.
    #[must_use]
    pub const fn from_digest(digest: [u8; PEER_ID_LEN]) -> Self {
        Self(digest)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; PEER_ID_LEN] {
        &self.0
    }

    /// First four bytes as hex, for compact log fields.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.short())
    }
}

impl FromStr for PeerId {
    type Err = PeerIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| PeerIdParseError::InvalidHex(e.to_string()))?;
        let digest: [u8; PEER_ID_LEN] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| PeerIdParseError::InvalidLength {
                    expected: PEER_ID_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(digest))
    }
}

/// A peer together with the transport addresses it can be dialed on.
///
/// The addresses do not carry the trailing `/p2p/<peer>` component; use
/// [`PeerAddrInfo::p2p_addrs`] to get dialable, self-describing addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAddrInfo {
    pub peer_id: PeerId,
    pub addrs: Vec<Multiaddr>,
}

impl PeerAddrInfo {
    #[must_use]
    pub fn new(peer_id: PeerId, addrs: Vec<Multiaddr>) -> Self {
        Self { peer_id, addrs }
    }

    /// Group `/p2p/`-terminated addresses by peer.
    ///
    /// Several addresses of the same peer collapse into one record. Records
    /// keep the order in which each peer was first seen, and addresses keep
    /// their input order within a record.
    pub fn from_p2p_addrs<I>(addrs: I) -> Result<Vec<Self>, AddrParseError>
    where
        I: IntoIterator<Item = Multiaddr>,
    {
        let mut infos: Vec<Self> = Vec::new();
        for addr in addrs {
            let (transport, peer_id) = addr.split_peer_id();
            let peer_id = peer_id.ok_or_else(|| AddrParseError::MissingPeerId(addr.to_string()))?;

            match infos.iter_mut().find(|info| info.peer_id == peer_id) {
                Some(info) => {
                    if !transport.is_empty() && !info.addrs.contains(&transport) {
                        info.addrs.push(transport);
                    }
                }
                None => {
                    let addrs = if transport.is_empty() {
                        Vec::new()
                    } else {
                        vec![transport]
                    };
                    infos.push(Self::new(peer_id, addrs));
                }
            }
        }
        Ok(infos)
    }

    /// Addresses with the peer's `/p2p/<peer>` component appended.
    #[must_use]
    pub fn p2p_addrs(&self) -> Vec<Multiaddr> {
        self.addrs
            .iter()
            .map(|addr| addr.clone().with(Protocol::P2p(self.peer_id)))
            .collect()
    }
}
