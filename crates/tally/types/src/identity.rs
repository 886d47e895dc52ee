//! Caller identities.
//!
//! An [`Identity`] is an opaque byte string. Two identities are equal iff
//! their bytes are equal. Identities derived from an Ed25519 public key are
//! self-authenticating: the holder of the matching signing key is the only
//! party that can produce requests the service attributes to them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Trailing tag byte of a key-derived identity.
pub const SELF_AUTHENTICATING_TAG: u8 = 0x02;

/// The single byte making up the anonymous identity.
pub const ANONYMOUS_TAG: u8 = 0x04;

/// Upper bound on identity length in bytes.
pub const MAX_IDENTITY_LEN: usize = 29;

const KEY_HASH_LEN: usize = 28;

/// Opaque caller identity, ordered and compared by its bytes.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(Vec<u8>);

impl Identity {
    /// The distinguished identity of callers that present no proof.
    pub fn anonymous() -> Self {
        Self(vec![ANONYMOUS_TAG])
    }

    /// Derive the identity owned by an Ed25519 public key.
    pub fn self_authenticating(public_key: &[u8; 32]) -> Self {
        let digest = blake3::hash(public_key);
        let mut bytes = Vec::with_capacity(MAX_IDENTITY_LEN);
        bytes.extend_from_slice(&digest.as_bytes()[..KEY_HASH_LEN]);
        bytes.push(SELF_AUTHENTICATING_TAG);
        Self(bytes)
    }

    /// Build an identity from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityParseError> {
        if bytes.is_empty() {
            return Err(IdentityParseError::Empty);
        }
        if bytes.len() > MAX_IDENTITY_LEN {
            return Err(IdentityParseError::TooLong(bytes.len()));
        }
        Ok(Self(bytes.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.as_slice() == [ANONYMOUS_TAG]
    }

    /// Lowercase hex rendering, the textual form used on the wire.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_anonymous() {
            f.write_str("Identity(anonymous)")
        } else {
            write!(f, "Identity({})", self.to_hex())
        }
    }
}

impl FromStr for Identity {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|e| IdentityParseError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Reasons an identity could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityParseError {
    #[error("identity is empty")]
    Empty,

    #[error("identity is {0} bytes, maximum is {MAX_IDENTITY_LEN}")]
    TooLong(usize),

    #[error("identity is not valid hex: {0}")]
    InvalidHex(String),
}
