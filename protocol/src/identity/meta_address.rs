//! # Stealth Meta-Addresses
//!
//! A stealth meta-address is a 66-byte blob: a compressed spending public key
//! followed by a compressed viewing public key. Senders derive fresh one-time
//! addresses from it off-core. The registry treats it as opaque bytes and only
//! ever checks its length before hashing it into a [`CommitmentHash`].
//!
//! The textual form follows the stealth-address URI convention:
//!
//! ```text
//! st:eth:0x<132 hex chars>
//! ```
//!
//! Bare `0x`-prefixed or unprefixed hex is accepted as well.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::address::{decode_hex_prefixed, ParseError};
use crate::config::{META_ADDRESS_CHAIN_TAG, META_ADDRESS_LENGTH, META_ADDRESS_URI_SCHEME};
use crate::crypto::CommitmentHash;

/// Errors from parsing or constructing a meta-address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetaAddressError {
    #[error("meta-address must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("malformed meta-address URI: {0}")]
    MalformedUri(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Decode a textual meta-address into raw bytes without checking its length.
///
/// Accepts `st:<chain>:0x<hex>`, `0x<hex>`, or bare hex. Callers that forward
/// user input to the registry use this so that a wrong-length blob reaches the
/// registry's own length guard instead of being rejected earlier with a
/// different error.
pub fn decode_meta_address_bytes(input: &str) -> Result<Vec<u8>, MetaAddressError> {
    let trimmed = input.trim();
    let payload = match trimmed.strip_prefix(META_ADDRESS_URI_SCHEME) {
        Some(rest) if rest.starts_with(':') => {
            let mut parts = rest[1..].splitn(2, ':');
            let chain = parts.next().unwrap_or_default();
            let body = parts
                .next()
                .ok_or_else(|| MetaAddressError::MalformedUri(trimmed.to_string()))?;
            if chain.is_empty() {
                return Err(MetaAddressError::MalformedUri(trimmed.to_string()));
            }
            body
        }
        _ => trimmed,
    };
    Ok(decode_hex_prefixed(payload)?)
}

/// A validated 66-byte stealth meta-address.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StealthMetaAddress([u8; META_ADDRESS_LENGTH]);

impl StealthMetaAddress {
    pub fn from_bytes(bytes: [u8; META_ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The commitment the home registry records for this meta-address.
    pub fn commitment(&self) -> CommitmentHash {
        CommitmentHash::of(&self.0)
    }
}

impl TryFrom<&[u8]> for StealthMetaAddress {
    type Error = MetaAddressError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; META_ADDRESS_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| MetaAddressError::InvalidLength {
                    expected: META_ADDRESS_LENGTH,
                    actual: bytes.len(),
                })?;
        Ok(Self(array))
    }
}

impl FromStr for StealthMetaAddress {
    type Err = MetaAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_meta_address_bytes(s)?;
        Self::try_from(bytes.as_slice())
    }
}

impl fmt::Display for StealthMetaAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:0x{}",
            META_ADDRESS_URI_SCHEME,
            META_ADDRESS_CHAIN_TAG,
            hex::encode(self.0)
        )
    }
}

impl fmt::Debug for StealthMetaAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StealthMetaAddress({})", self)
    }
}

impl Serialize for StealthMetaAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StealthMetaAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StealthMetaAddress {
        let mut bytes = [0u8; META_ADDRESS_LENGTH];
        bytes[0] = 0x02;
        bytes[33] = 0x03;
        bytes[65] = 0xFF;
        StealthMetaAddress::from_bytes(bytes)
    }

    #[test]
    fn uri_round_trip() {
        let meta = sample();
        let text = meta.to_string();
        assert!(text.starts_with("st:eth:0x"));
        assert_eq!(text.parse::<StealthMetaAddress>().unwrap(), meta);
    }

    #[test]
    fn accepts_bare_and_prefixed_hex() {
        let meta = sample();
        let hex_body = hex::encode(meta.as_bytes());
        assert_eq!(hex_body.parse::<StealthMetaAddress>().unwrap(), meta);
        assert_eq!(
            format!("0x{}", hex_body).parse::<StealthMetaAddress>().unwrap(),
            meta
        );
    }

    #[test]
    fn accepts_other_chain_tags() {
        let meta = sample();
        let text = format!("st:base:0x{}", hex::encode(meta.as_bytes()));
        assert_eq!(text.parse::<StealthMetaAddress>().unwrap(), meta);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = "0xabcd".parse::<StealthMetaAddress>().unwrap_err();
        assert_eq!(
            err,
            MetaAddressError::InvalidLength {
                expected: 66,
                actual: 2
            }
        );
    }

    #[test]
    fn raw_decode_keeps_wrong_lengths() {
        let bytes = decode_meta_address_bytes("st:eth:0xabcd").unwrap();
        assert_eq!(bytes, vec![0xab, 0xcd]);
    }

    #[test]
    fn rejects_uri_without_chain() {
        assert!(matches!(
            decode_meta_address_bytes("st::0xabcd"),
            Err(MetaAddressError::MalformedUri(_))
        ));
        assert!(matches!(
            decode_meta_address_bytes("st:eth"),
            Err(MetaAddressError::MalformedUri(_))
        ));
    }

    #[test]
    fn commitment_matches_raw_hash() {
        let meta = sample();
        assert_eq!(meta.commitment(), CommitmentHash::of(meta.as_bytes()));
    }
}
