//! # Hashing Utilities
//!
//! HumanLink hashes exactly one kind of thing on-core: stealth meta-addresses,
//! into commitments. The hash is Keccak-256 because the commitment has to be
//! reproducible by EVM registry deployments, relayers, and off-chain provers
//! alike, and `keccak256` is what all of them already speak.
//!
//! ## Field mapping
//!
//! Proof public inputs are 256-bit big-endian words. The BN254 scalar field
//! is ~254 bits, so a Keccak output can exceed the field order. `word_to_field`
//! reduces modulo `r`; circuits that bind to a commitment must apply the same
//! reduction to their public input.

use ark_bn254::Fr;
use ark_ff::PrimeField;
use sha3::{Digest, Keccak256};

use crate::config::HASH_OUTPUT_LENGTH;

/// Compute the Keccak-256 hash of the input data.
///
/// # Example
///
/// ```
/// use humanlink_protocol::crypto::keccak256;
///
/// let hash = keccak256(b"humanlink");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn keccak256(data: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; HASH_OUTPUT_LENGTH];
    output.copy_from_slice(&result);
    output
}

/// Map a 256-bit big-endian word onto a BN254 scalar field element.
///
/// Values at or above the field order wrap around (`word mod r`).
pub fn word_to_field(word: &[u8; 32]) -> Fr {
    Fr::from_be_bytes_mod_order(word)
}
