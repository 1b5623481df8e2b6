//! # Commitment Hashes
//!
//! A commitment is `keccak256(meta_address)`. It is the only artifact that
//! crosses network boundaries: the home registry stores it on `link`, the
//! transport layer carries it, and every instance checks claims against it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::hash::keccak256;
use crate::config::HASH_OUTPUT_LENGTH;
use crate::identity::address::{decode_hex_fixed, ParseError};

/// Keccak-256 commitment to a stealth meta-address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitmentHash([u8; HASH_OUTPUT_LENGTH]);

impl CommitmentHash {
    /// Hash raw meta-address bytes into a commitment.
    ///
    /// No length check happens here; the registry enforces the 66-byte rule
    /// before it ever hashes.
    pub fn of(meta_address: &[u8]) -> Self {
        Self(keccak256(meta_address))
    }

    pub const fn from_bytes(bytes: [u8; HASH_OUTPUT_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_OUTPUT_LENGTH] {
        &self.0
    }

    /// The commitment as a 256-bit big-endian proof public input.
    pub fn to_word(&self) -> [u8; 32] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for CommitmentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for CommitmentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitmentHash({})", self)
    }
}

impl FromStr for CommitmentHash {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex_fixed::<HASH_OUTPUT_LENGTH>(s).map(Self)
    }
}

impl Serialize for CommitmentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CommitmentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
