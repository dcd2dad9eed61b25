//! Participant identities.
//!
//! Callers are identified by BIP-340 x-only public keys, rendered as 64
//! lowercase hex characters.

use std::{fmt, str::FromStr};

use secp256k1::{Keypair, Secp256k1, SecretKey, XOnlyPublicKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::{error::Result, WagerError};

/// Identity of a bet creator or acceptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(XOnlyPublicKey);

impl Identity {
    /// Derive the identity controlled by a 32-byte secret key.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Result<Self> {
        let secp = Secp256k1::new();
        let secret_key = SecretKey::from_slice(secret)?;
        let keypair = Keypair::from_secret_key(&secp, &secret_key);
        let (pubkey, _parity) = keypair.x_only_public_key();
        Ok(Self(pubkey))
    }

    /// Derive a deterministic identity whose secret key is `sha256(seed)`.
    pub fn from_seed(seed: &str) -> Result<Self> {
        let digest = Sha256::digest(seed.as_bytes());
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&digest);
        Self::from_secret_bytes(&secret)
    }

    /// Parse a hex key, or treat anything that is not one as a seed alias.
    pub fn resolve(input: &str) -> Result<Self> {
        if input.len() == 64 && input.chars().all(|c| c.is_ascii_hexdigit()) {
            input.parse()
        } else {
            Self::from_seed(input)
        }
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.serialize()
    }

    /// First eight hex characters, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.to_bytes()[..4])
    }
}

impl From<XOnlyPublicKey> for Identity {
    fn from(key: XOnlyPublicKey) -> Self {
        Self(key)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl FromStr for Identity {
    type Err = WagerError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(WagerError::InvalidIdentity(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(XOnlyPublicKey::from_slice(&bytes)?))
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
