//! # Addresses, Networks, and Call Context
//!
//! Accounts are 20-byte addresses rendered as `0x`-prefixed hex. The zero
//! address is the null address: it never holds credentials and can never be
//! claimed as human.
//!
//! Registry calls carry an explicit [`CallContext`] naming the network the
//! call executes on and the calling identity. There is no ambient global for
//! either, so the home-network guard can be exercised with any simulated
//! network id.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{self, ADDRESS_LENGTH};

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Errors from parsing hex-encoded identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The input is not valid hexadecimal.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// The decoded byte string has the wrong length.
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required length in bytes.
        expected: usize,
        /// Decoded length in bytes.
        actual: usize,
    },
}

/// Decode hex with an optional `0x` prefix, any length.
pub(crate) fn decode_hex_prefixed(s: &str) -> Result<Vec<u8>, ParseError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| ParseError::InvalidHex(e.to_string()))
}

/// Decode hex with an optional `0x` prefix into exactly `N` bytes.
pub(crate) fn decode_hex_fixed<const N: usize>(s: &str) -> Result<[u8; N], ParseError> {
    let bytes = decode_hex_prefixed(s)?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| ParseError::InvalidLength {
        expected: N,
        actual,
    })
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The null address.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    /// The address as a 256-bit big-endian integer, i.e. right-aligned in a
    /// 32-byte word. This is the form proofs bind to.
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[32 - ADDRESS_LENGTH..].copy_from_slice(&self.0);
        word
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex_fixed::<ADDRESS_LENGTH>(s).map(Self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// NetworkId
// ---------------------------------------------------------------------------

/// Identifier of the network a registry instance runs on (an EVM chain id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(pub u64);

impl NetworkId {
    pub fn name(&self) -> String {
        config::network_name(self.0)
    }
}

impl From<u64> for NetworkId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", config::network_name(self.0), self.0)
    }
}

// ---------------------------------------------------------------------------
// CallContext
// ---------------------------------------------------------------------------

/// Execution context of a mutating registry call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// The network the call executes on.
    pub network: NetworkId,
    /// The identity submitting the call.
    pub caller: Address,
}

impl CallContext {
    pub fn new(network: impl Into<NetworkId>, caller: Address) -> Self {
        Self {
            network: network.into(),
            caller,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(Address::default().is_zero());
        assert!(!Address::from_bytes([1u8; 20]).is_zero());
    }

    #[test]
    fn parse_with_and_without_prefix() {
        let with: Address = "0x00000000000000000000000000000000000000ab".parse().unwrap();
        let without: Address = "00000000000000000000000000000000000000AB".parse().unwrap();
        assert_eq!(with, without);
        assert_eq!(with.as_bytes()[19], 0xAB);
    }

    #[test]
    fn display_is_lowercase_prefixed_hex() {
        let mut bytes = [0u8; 20];
        bytes[0] = 0xDE;
        bytes[19] = 0xAD;
        let addr = Address::from_bytes(bytes);
        assert_eq!(
            addr.to_string(),
            "0xde000000000000000000000000000000000000ad"
        );
    }

    #[test]
    fn rejects_wrong_length() {
        let err = "0xabc0".parse::<Address>().unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidLength {
                expected: 20,
                actual: 2
            }
        );
    }

    #[test]
    fn rejects_non_hex() {
        assert!(matches!(
            "0xzz".parse::<Address>(),
            Err(ParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn word_is_right_aligned() {
        let addr = Address::from_bytes([0x42; 20]);
        let word = addr.to_word();
        assert_eq!(&word[..12], &[0u8; 12]);
        assert_eq!(&word[12..], &[0x42; 20]);
    }

    #[test]
    fn serde_round_trip_through_json() {
        let addr = Address::from_bytes([7u8; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }

    #[test]
    fn network_id_display_uses_friendly_name() {
        assert_eq!(NetworkId(1).to_string(), "ethereum(1)");
        assert_eq!(NetworkId(5).to_string(), "chain-5(5)");
    }
}
