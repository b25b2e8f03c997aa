//! # Identity Registry
//!
//! Derives each member's public identity and reachable address from its
//! configured private key material. Derivation is pure and
//! order-preserving: member `i` of the configuration is identity `i` of the
//! registry.

pub mod keys;
pub mod registry;

pub use keys::{peer_id_from_public_key, KeyPair};
pub use registry::{resolve_address, Identity, IdentityRegistry};
