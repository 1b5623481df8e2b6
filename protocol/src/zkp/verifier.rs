//! # Groth16 Proof Verification
//!
//! [`Groth16Verifier`] adapts an arkworks BN254 verification key to the
//! [`ProofVerifier`] capability. Every registry instance that accepts claims
//! holds one, built from the same verification key so that a proof valid on
//! one network is valid on all of them.
//!
//! Groth16 verification is three pairings plus a small multi-scalar
//! multiplication, constant-time in circuit size. The key is prepared once at
//! construction.

use ark_bn254::Bn254;
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, VerifyingKey};
use ark_serialize::CanonicalDeserialize;
use ark_snark::SNARK;
use thiserror::Error;

use super::{ProofVerifier, PublicInputs};
use crate::capability::CapabilityError;
use crate::config::PUBLIC_INPUT_COUNT;
use crate::identity::Address;

/// Errors from building a [`Groth16Verifier`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifierSetupError {
    #[error("failed to deserialize verification key: {0}")]
    Deserialize(String),

    #[error("verification key expects {actual} public inputs, claims need {expected}")]
    WrongInputCount { expected: usize, actual: usize },

    #[error("failed to prepare verification key: {0}")]
    Prepare(String),
}

// ---------------------------------------------------------------------------
// Groth16Verifier
// ---------------------------------------------------------------------------

/// Groth16 verifier over BN254 for claim proofs.
pub struct Groth16Verifier {
    address: Address,
    pvk: PreparedVerifyingKey<Bn254>,
}

impl Groth16Verifier {
    /// Build from an arkworks verification key.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierSetupError::WrongInputCount`] unless the key was
    /// generated for exactly two public inputs.
    pub fn from_vk(address: Address, vk: VerifyingKey<Bn254>) -> Result<Self, VerifierSetupError> {
        // gamma_abc_g1 carries one extra element for the constant term.
        let actual = vk.gamma_abc_g1.len().saturating_sub(1);
        if actual != PUBLIC_INPUT_COUNT {
            return Err(VerifierSetupError::WrongInputCount {
                expected: PUBLIC_INPUT_COUNT,
                actual,
            });
        }

        let pvk = Groth16::<Bn254>::process_vk(&vk)
            .map_err(|e| VerifierSetupError::Prepare(e.to_string()))?;

        Ok(Self { address, pvk })
    }

    /// Build from a compressed-serialized verification key.
    pub fn from_vk_bytes(address: Address, data: &[u8]) -> Result<Self, VerifierSetupError> {
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(data)
            .map_err(|e| VerifierSetupError::Deserialize(e.to_string()))?;
        Self::from_vk(address, vk)
    }
}

impl std::fmt::Debug for Groth16Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Groth16Verifier")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl ProofVerifier for Groth16Verifier {
    fn address(&self) -> Address {
        self.address
    }

    /// Malformed proof bytes are a rejected proof, not a verifier failure:
    /// the bytes come straight from an untrusted claimant.
    fn verify(&self, proof: &[u8], inputs: &PublicInputs) -> Result<bool, CapabilityError> {
        let proof = match Proof::<Bn254>::deserialize_compressed(proof) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(error = %e, "rejecting undecodable proof");
                return Ok(false);
            }
        };

        let public_inputs = inputs.to_field_elements();

        Groth16::<Bn254>::verify_with_processed_vk(&self.pvk, &public_inputs, &proof)
            .map_err(|e| CapabilityError::Internal(format!("Groth16 verification failed: {}", e)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
