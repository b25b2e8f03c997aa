//! # Multi-segment Addresses
//!
//! Textual, self-describing addresses of the form
//! `/ip4/10.0.0.1/tcp/4007/p2p/<peer>`. Only the protocols the landscape
//! hands to its networking collaborator are understood; anything else is
//! rejected at parse time.

use crate::errors::AddrParseError;
use crate::peer::PeerId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// One `/<name>/<value>` segment of an address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Protocol {
    Ip4(Ipv4Addr),
    Ip6(Ipv6Addr),
    Dns4(String),
    Dns6(String),
    Tcp(u16),
    Udp(u16),
    P2p(PeerId),
}

impl Protocol {
    /// Segment name as it appears in text.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ip4(_) => "ip4",
            Self::Ip6(_) => "ip6",
            Self::Dns4(_) => "dns4",
            Self::Dns6(_) => "dns6",
            Self::Tcp(_) => "tcp",
            Self::Udp(_) => "udp",
            Self::P2p(_) => "p2p",
        }
    }

    fn parse(name: &str, value: &str) -> Result<Self, AddrParseError> {
        let invalid = || AddrParseError::InvalidValue {
            protocol: name.to_string(),
            value: value.to_string(),
        };

        match name {
            "ip4" => value.parse().map(Self::Ip4).map_err(|_| invalid()),
            "ip6" => value.parse().map(Self::Ip6).map_err(|_| invalid()),
            "dns4" | "dns6" => {
                if value.is_empty() || value.contains(char::is_whitespace) {
                    return Err(invalid());
                }
                Ok(if name == "dns4" {
                    Self::Dns4(value.to_string())
                } else {
                    Self::Dns6(value.to_string())
                })
            }
            "tcp" => value.parse().map(Self::Tcp).map_err(|_| invalid()),
            "udp" => value.parse().map(Self::Udp).map_err(|_| invalid()),
            "p2p" => value.parse().map(Self::P2p).map_err(|_| invalid()),
            other => Err(AddrParseError::UnknownProtocol(other.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip4(ip) => write!(f, "/ip4/{ip}"),
            Self::Ip6(ip) => write!(f, "/ip6/{ip}"),
            Self::Dns4(host) => write!(f, "/dns4/{host}"),
            Self::Dns6(host) => write!(f, "/dns6/{host}"),
            Self::Tcp(port) => write!(f, "/tcp/{port}"),
            Self::Udp(port) => write!(f, "/udp/{port}"),
            Self::P2p(peer) => write!(f, "/p2p/{peer}"),
        }
    }
}

/// An ordered list of protocol segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Multiaddr(Vec<Protocol>);

impl Multiaddr {
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Append a segment.
    #[must_use]
    pub fn with(mut self, protocol: Protocol) -> Self {
        self.0.push(protocol);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Protocol> {
        self.0.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Peer named by the trailing `/p2p/` segment, if any.
    #[must_use]
    pub fn peer_id(&self) -> Option<PeerId> {
        match self.0.last() {
            Some(Protocol::P2p(peer)) => Some(*peer),
            _ => None,
        }
    }

    /// Split off the trailing `/p2p/` segment.
    #[must_use]
    pub fn split_peer_id(&self) -> (Multiaddr, Option<PeerId>) {
        match self.0.split_last() {
            Some((Protocol::P2p(peer), rest)) => (Self(rest.to_vec()), Some(*peer)),
            _ => (self.clone(), None),
        }
    }
}

impl fmt::Display for Multiaddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for protocol in &self.0 {
            write!(f, "{protocol}")?;
        }
        Ok(())
    }
}

impl FromStr for Multiaddr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AddrParseError::Empty);
        }
        let Some(rest) = s.strip_prefix('/') else {
            return Err(AddrParseError::MissingLeadingSlash(s.to_string()));
        };

        let mut segments = rest.split('/');
        let mut protocols = Vec::new();
        while let Some(name) = segments.next() {
            if name.is_empty() {
                return Err(AddrParseError::UnknownProtocol(String::new()));
            }
            let value = segments
                .next()
                .ok_or_else(|| AddrParseError::MissingValue(name.to_string()))?;
            protocols.push(Protocol::parse(name, value)?);
        }
        Ok(Self(protocols))
    }
}

impl TryFrom<String> for Multiaddr {
    type Error = AddrParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Multiaddr> for String {
    fn from(addr: Multiaddr) -> Self {
        addr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::PEER_ID_LEN;

    #[test]
    fn test_parse_and_display() {
        let addr: Multiaddr = "/ip4/0.0.0.0/tcp/4007".parse().unwrap();
        assert_eq!(
            addr.iter().cloned().collect::<Vec<_>>(),
            vec![Protocol::Ip4(Ipv4Addr::UNSPECIFIED), Protocol::Tcp(4007)]
        );
        assert_eq!(addr.to_string(), "/ip4/0.0.0.0/tcp/4007");

        let v6: Multiaddr = "/ip6/::1/udp/9000".parse().unwrap();
        assert_eq!(v6.to_string(), "/ip6/::1/udp/9000");

        let dns: Multiaddr = "/dns4/node.example/tcp/443".parse().unwrap();
        assert_eq!(dns.to_string(), "/dns4/node.example/tcp/443");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Multiaddr>(), Err(AddrParseError::Empty));
        assert!(matches!(
            "ip4/1.2.3.4".parse::<Multiaddr>(),
            Err(AddrParseError::MissingLeadingSlash(_))
        ));
        assert!(matches!(
            "/ip4/1.2.3.4/tcp".parse::<Multiaddr>(),
            Err(AddrParseError::MissingValue(p)) if p == "tcp"
        ));
        assert!(matches!(
            "/ip4/300.0.0.1/tcp/1".parse::<Multiaddr>(),
            Err(AddrParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            "/ip4/1.2.3.4/tcp/70000".parse::<Multiaddr>(),
            Err(AddrParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            "/quic/1".parse::<Multiaddr>(),
            Err(AddrParseError::UnknownProtocol(p)) if p == "quic"
        ));
        assert!(matches!(
            "/ip4/1.2.3.4/".parse::<Multiaddr>(),
            Err(AddrParseError::UnknownProtocol(_))
        ));
    }

    #[test]
    fn test_split_peer_id() {
        let peer = PeerId::from_digest([9; PEER_ID_LEN]);
        let addr: Multiaddr = format!("/ip4/127.0.0.1/tcp/1/p2p/{peer}").parse().unwrap();

        assert_eq!(addr.peer_id(), Some(peer));
        let (transport, split) = addr.split_peer_id();
        assert_eq!(split, Some(peer));
        assert_eq!(transport.to_string(), "/ip4/127.0.0.1/tcp/1");
        assert_eq!(transport.peer_id(), None);
    }

    #[test]
    fn test_serde_as_string() {
        let addr: Multiaddr = "/ip4/10.1.2.3/tcp/4010".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"/ip4/10.1.2.3/tcp/4010\"");
        let back: Multiaddr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);

        assert!(serde_json::from_str::<Multiaddr>("\"nonsense\"").is_err());
    }
}
