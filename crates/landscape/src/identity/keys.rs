//! # Ed25519 Key Material
//!
//! Accepted encodings (hex, raw bytes):
//!
//! | Length | Layout                              |
//! |--------|-------------------------------------|
//! | 32     | seed                                |
//! | 64     | seed ‖ public key                   |
//! | 96     | seed ‖ public key ‖ public key      |
//!
//! When the public half is present it must match the key derived from the
//! seed. Decoded secret bytes are zeroized as soon as the key is built.

use crate::error::IdentityError;
use ed25519_dalek::{
    Signature, Signer, SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH,
};
use landscape_types::{PeerId, PEER_ID_LEN};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Ed25519 keypair of one member.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Decode hex-encoded key material.
    pub fn from_hex(material: &str) -> Result<Self, IdentityError> {
        let bytes = Zeroizing::new(
            hex::decode(material.trim())
                .map_err(|e| IdentityError::InvalidKeyMaterial(format!("not hex: {e}")))?,
        );
        Self::from_bytes(&bytes)
    }

    /// Decode raw key material.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        const PAIR_LEN: usize = SECRET_KEY_LENGTH + PUBLIC_KEY_LENGTH;
        const REDUNDANT_LEN: usize = PAIR_LEN + PUBLIC_KEY_LENGTH;

        let (seed, public): (&[u8], Option<&[u8]>) = match bytes.len() {
            SECRET_KEY_LENGTH => (bytes, None),
            PAIR_LEN => {
                let (seed, public) = bytes.split_at(SECRET_KEY_LENGTH);
                (seed, Some(public))
            }
            REDUNDANT_LEN => {
                let (pair, redundant) = bytes.split_at(PAIR_LEN);
                if pair[SECRET_KEY_LENGTH..] != *redundant {
                    return Err(IdentityError::InvalidKeyMaterial(
                        "redundant public key does not match".to_string(),
                    ));
                }
                let (seed, public) = pair.split_at(SECRET_KEY_LENGTH);
                (seed, Some(public))
            }
            other => {
                return Err(IdentityError::InvalidKeyMaterial(format!(
                    "expected {SECRET_KEY_LENGTH}, {PAIR_LEN} or {REDUNDANT_LEN} bytes, got {other}"
                )))
            }
        };

        let seed: Zeroizing<[u8; SECRET_KEY_LENGTH]> = Zeroizing::new(
            seed.try_into()
                .map_err(|_| IdentityError::InvalidKeyMaterial("bad seed length".to_string()))?,
        );
        let signing_key = SigningKey::from_bytes(&seed);

        if let Some(public) = public {
            if signing_key.verifying_key().as_bytes().as_slice() != public {
                return Err(IdentityError::InvalidKeyMaterial(
                    "public key does not match seed".to_string(),
                ));
            }
        }

        Ok(Self { signing_key })
    }

    #[must_use]
    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Peer id derived from the public key.
    #[must_use]
    pub fn peer_id(&self) -> PeerId {
        peer_id_from_public_key(&self.public_key())
    }

    /// Sign a message (deterministic).
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Secret seed followed by the public key, hex-encoded.
    #[must_use]
    pub fn to_hex(&self) -> Zeroizing<String> {
        let mut pair = Zeroizing::new([0u8; SECRET_KEY_LENGTH + PUBLIC_KEY_LENGTH]);
        pair[..SECRET_KEY_LENGTH].copy_from_slice(self.signing_key.as_bytes());
        pair[SECRET_KEY_LENGTH..].copy_from_slice(self.public_key().as_bytes());
        Zeroizing::new(hex::encode(pair.as_slice()))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("peer_id", &self.peer_id())
            .finish_non_exhaustive()
    }
}

/// SHA-256 digest of the raw public key.
#[must_use]
pub fn peer_id_from_public_key(public_key: &VerifyingKey) -> PeerId {
    let mut digest = [0u8; PEER_ID_LEN];
    digest.copy_from_slice(&Sha256::digest(public_key.as_bytes()));
    PeerId::from_digest(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Verifier;

    const MEMBER_0: &str = "e4b404b19b59749a92141d1f1ef22509ac01480148923a1f7c9f65e68e80b85f97ea5ddec354513941796d00085c66daa866da65aa2a548a5fa2f0b7388823a4";

    #[test]
    fn test_decode_seed_and_public_key() {
        let pair = KeyPair::from_hex(MEMBER_0).unwrap();
        assert_eq!(
            pair.peer_id().to_string(),
            "20c356f4341ff82c186b83c264ea395de37c092a20025c916df2117e8c9827ee"
        );
        assert_eq!(pair.to_hex().as_str(), MEMBER_0);
    }

    #[test]
    fn test_seed_only_matches_full_pair() {
        let full = KeyPair::from_hex(MEMBER_0).unwrap();
        let seed_only = KeyPair::from_hex(&MEMBER_0[..64]).unwrap();
        assert_eq!(full.public_key(), seed_only.public_key());
    }

    #[test]
    fn test_redundant_public_key_layout() {
        let redundant = format!("{MEMBER_0}{}", &MEMBER_0[64..]);
        let pair = KeyPair::from_hex(&redundant).unwrap();
        assert_eq!(pair.to_hex().as_str(), MEMBER_0);

        let wrong = format!("{MEMBER_0}{}", "00".repeat(32));
        assert!(matches!(
            KeyPair::from_hex(&wrong),
            Err(IdentityError::InvalidKeyMaterial(_))
        ));
    }

    #[test]
    fn test_rejects_bad_material() {
        assert!(matches!(
            KeyPair::from_hex("not-hex"),
            Err(IdentityError::InvalidKeyMaterial(_))
        ));
        assert!(matches!(
            KeyPair::from_hex("abcd"),
            Err(IdentityError::InvalidKeyMaterial(_))
        ));

        // Seed with someone else's public half.
        let mut tampered = MEMBER_0.to_string();
        tampered.replace_range(64..66, "00");
        assert!(matches!(
            KeyPair::from_hex(&tampered),
            Err(IdentityError::InvalidKeyMaterial(_))
        ));
    }

    #[test]
    fn test_sign_verify() {
        let pair = KeyPair::from_hex(MEMBER_0).unwrap();
        let signature = pair.sign(b"board entry");
        assert!(pair.public_key().verify(b"board entry", &signature).is_ok());
        assert!(pair.public_key().verify(b"other entry", &signature).is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let pair = KeyPair::from_hex(MEMBER_0).unwrap();
        let debug = format!("{pair:?}");
        assert!(!debug.contains(&MEMBER_0[..16]));
        assert!(debug.contains("KeyPair"));
    }
}
