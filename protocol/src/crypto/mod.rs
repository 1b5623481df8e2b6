//! # Cryptographic Primitives for HumanLink
//!
//! Deliberately tiny. The registry hashes meta-addresses into commitments and
//! maps 256-bit words onto the BN254 scalar field for proof verification.
//! Everything else (key derivation, stealth address math, proving) happens
//! off-core and is trusted only through the proof verifier.

pub mod commitment;
pub mod hash;

pub use commitment::CommitmentHash;
pub use hash::{keccak256, word_to_field};
