//! # Zero-Knowledge Proof Module
//!
//! The registry consumes proofs; it never produces them. A claim proof states
//! "this one-time address was derived from the meta-address behind this
//! commitment" without revealing the meta-address's keys. The registry hands
//! the proof and two public inputs to a [`ProofVerifier`] and records the
//! address only on a `true` answer.
//!
//! ## Architecture
//!
//! ```text
//! mod.rs      : ProofVerifier capability and PublicInputs
//! verifier.rs : Groth16/BN254 adapter (Groth16Verifier)
//! fixture.rs  : toy binding circuit for tests (feature `test-circuit`)
//! ```
//!
//! ## Public inputs (in order)
//!
//! | index | value |
//! |-------|-------|
//! | 0     | derived address, right-aligned in a 256-bit word |
//! | 1     | commitment hash as a 256-bit word |

#[cfg(any(test, feature = "test-circuit"))]
pub mod fixture;
pub mod verifier;

use ark_bn254::Fr;

use crate::capability::CapabilityError;
use crate::config::{PUBLIC_INPUT_COUNT, PUBLIC_INPUT_WORD_LENGTH};
use crate::crypto::{word_to_field, CommitmentHash};
use crate::identity::Address;

pub use verifier::{Groth16Verifier, VerifierSetupError};

/// Ordered public inputs of a claim proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicInputs([[u8; PUBLIC_INPUT_WORD_LENGTH]; PUBLIC_INPUT_COUNT]);

impl PublicInputs {
    /// Build the inputs for claiming `derived_address` against `commitment`.
    pub fn for_claim(derived_address: &Address, commitment: &CommitmentHash) -> Self {
        Self([derived_address.to_word(), commitment.to_word()])
    }

    pub fn words(&self) -> &[[u8; PUBLIC_INPUT_WORD_LENGTH]; PUBLIC_INPUT_COUNT] {
        &self.0
    }

    /// The inputs as BN254 scalars, each word reduced modulo the field order.
    pub fn to_field_elements(&self) -> Vec<Fr> {
        self.0.iter().map(word_to_field).collect()
    }
}

/// Stateless, deterministic proof verification capability.
pub trait ProofVerifier: Send + Sync {
    /// Address of the verifier contract. The zero address means "not
    /// configured" and is rejected at registry construction.
    fn address(&self) -> Address;

    /// Check `proof` against `inputs`.
    ///
    /// `Ok(false)` is a rejected proof. `Err` means the verifier could not
    /// produce an answer at all.
    fn verify(&self, proof: &[u8], inputs: &PublicInputs) -> Result<bool, CapabilityError>;
}
