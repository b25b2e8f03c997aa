use crate::error::{ConfigError, IdentityError, Result, TopologyError};
use crate::identity::keys::KeyPair;
use ed25519_dalek::VerifyingKey;
use landscape_types::{AddrParseError, Multiaddr, PeerAddrInfo, PeerId, Protocol};
use std::collections::HashMap;
use tracing::{debug, info};

/// A member's keypair, derived peer id and transport addresses.
///
/// Addresses are stored without the `/p2p/` suffix; [`Identity::p2p_addrs`]
/// adds it.
#[derive(Debug)]
pub struct Identity {
    keypair: KeyPair,
    public_key: VerifyingKey,
    peer_id: PeerId,
    addrs: Vec<Multiaddr>,
}

impl Identity {
    /// Derive an identity (without addresses) from hex key material.
    pub fn derive(key_material: &str) -> std::result::Result<Self, IdentityError> {
        let keypair = KeyPair::from_hex(key_material)?;
        let public_key = keypair.public_key();
        let peer_id = keypair.peer_id();
        Ok(Self {
            keypair,
            public_key,
            peer_id,
            addrs: Vec::new(),
        })
    }

    #[must_use]
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    #[must_use]
    pub fn public_key(&self) -> &VerifyingKey {
        &self.public_key
    }

    #[must_use]
    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    #[must_use]
    pub fn addrs(&self) -> &[Multiaddr] {
        &self.addrs
    }

    /// Addresses with `/p2p/<peer>` appended.
    #[must_use]
    pub fn p2p_addrs(&self) -> Vec<Multiaddr> {
        self.addrs
            .iter()
            .map(|addr| addr.clone().with(Protocol::P2p(self.peer_id)))
            .collect()
    }

    fn push_addr(&mut self, addr: Multiaddr) {
        if !self.addrs.contains(&addr) {
            self.addrs.push(addr);
        }
    }
}

/// Turn a local address hint into a dialable `/p2p/` address for `identity`.
///
/// The hint must carry at least one transport segment. A hint that already
/// ends in `/p2p/<peer>` is accepted only when it names this identity.
pub fn resolve_address(
    identity: &Identity,
    hint: &str,
) -> std::result::Result<Multiaddr, IdentityError> {
    let resolution = |source: AddrParseError| IdentityError::AddressResolution {
        hint: hint.to_string(),
        source,
    };

    let parsed: Multiaddr = hint.parse().map_err(resolution)?;
    let (transport, named) = parsed.split_peer_id();
    if let Some(found) = named {
        if found != identity.peer_id() {
            return Err(IdentityError::ForeignPeerAddress {
                hint: hint.to_string(),
                expected: identity.peer_id(),
                found,
            });
        }
    }
    if transport.is_empty() {
        return Err(resolution(AddrParseError::Empty));
    }

    Ok(transport.with(Protocol::P2p(identity.peer_id())))
}

/// Ordered, immutable set of member identities.
#[derive(Debug)]
pub struct IdentityRegistry {
    identities: Vec<Identity>,
    by_peer: HashMap<PeerId, usize>,

    /// Dialable records, one per distinct peer, grouped from every member's
    /// `/p2p/` addresses.
    addr_infos: Vec<PeerAddrInfo>,
}

impl IdentityRegistry {
    /// Derive every member from parallel lists of key material and address
    /// hints.
    ///
    /// # Errors
    ///
    /// - `ConfigError::MembershipMismatch` if the lists differ in length
    /// - `ConfigError::EmptyMembership` if there are no members
    /// - `IdentityError` if any key or address is unusable
    pub fn from_membership<K, A>(private_keys: &[K], local_addrs: &[A]) -> Result<Self>
    where
        K: AsRef<str>,
        A: AsRef<str>,
    {
        if private_keys.len() != local_addrs.len() {
            return Err(ConfigError::MembershipMismatch {
                keys: private_keys.len(),
                addrs: local_addrs.len(),
            }
            .into());
        }
        if private_keys.is_empty() {
            return Err(ConfigError::EmptyMembership.into());
        }

        let mut identities = Vec::with_capacity(private_keys.len());
        let mut by_peer = HashMap::with_capacity(private_keys.len());

        for (index, (key, hint)) in private_keys.iter().zip(local_addrs).enumerate() {
            let mut identity = Identity::derive(key.as_ref())?;
            let resolved = resolve_address(&identity, hint.as_ref())?;
            let (transport, _) = resolved.split_peer_id();
            identity.push_addr(transport);

            debug!(
                index,
                peer = %identity.peer_id().short(),
                addr = %resolved,
                "Member identity derived"
            );

            // A repeated key keeps its first position.
            by_peer.entry(identity.peer_id()).or_insert(index);
            identities.push(identity);
        }

        let addr_infos =
            PeerAddrInfo::from_p2p_addrs(identities.iter().flat_map(Identity::p2p_addrs))
                .map_err(|source| IdentityError::AddressResolution {
                    hint: source.to_string(),
                    source,
                })?;

        info!(
            members = identities.len(),
            distinct = by_peer.len(),
            "Identity registry initialised"
        );

        Ok(Self {
            identities,
            by_peer,
            addr_infos,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Member at configuration position `index`.
    pub fn get(&self, index: usize) -> std::result::Result<&Identity, TopologyError> {
        self.identities
            .get(index)
            .ok_or(TopologyError::IndexOutOfRange {
                index,
                len: self.identities.len(),
            })
    }

    #[must_use]
    pub fn by_peer_id(&self, peer_id: &PeerId) -> Option<&Identity> {
        self.by_peer.get(peer_id).map(|&index| &self.identities[index])
    }

    #[must_use]
    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.by_peer.contains_key(peer_id)
    }

    /// Members in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.identities.iter()
    }

    /// Distinct peer ids in first-seen configuration order.
    #[must_use]
    pub fn peer_ids(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = Vec::with_capacity(self.by_peer.len());
        for identity in &self.identities {
            if !ids.contains(&identity.peer_id()) {
                ids.push(identity.peer_id());
            }
        }
        ids
    }

    /// Address records of all members, one record per distinct peer, in
    /// first-seen order.
    #[must_use]
    pub fn addr_infos(&self) -> Vec<PeerAddrInfo> {
        self.addr_infos.clone()
    }
}
