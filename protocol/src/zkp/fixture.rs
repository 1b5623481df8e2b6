//! # Claim Circuit Fixture
//!
//! A toy Groth16 circuit with the same public-input shape as real claim
//! proofs, for exercising [`Groth16Verifier`](super::Groth16Verifier) and the
//! registry end to end. It only binds a witness to the two public inputs
//! (`witness = address + commitment`); it says nothing about stealth address
//! derivation. Compiled for tests and behind the `test-circuit` feature.

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_relations::lc;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError, Variable};
use ark_serialize::CanonicalSerialize;
use ark_snark::SNARK;
use ark_std::rand::{CryptoRng, RngCore};
use thiserror::Error;

use super::PublicInputs;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("circuit synthesis failed: {0}")]
    Synthesis(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Binds one witness to `[address, commitment]`.
#[derive(Clone, Default)]
pub struct ClaimBindingCircuit {
    /// `None` during key generation.
    pub inputs: Option<[Fr; 2]>,
}

impl ConstraintSynthesizer<Fr> for ClaimBindingCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let values = self.inputs;

        let address = cs.new_input_variable(|| {
            values
                .map(|v| v[0])
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let commitment = cs.new_input_variable(|| {
            values
                .map(|v| v[1])
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let sum = cs.new_witness_variable(|| {
            values
                .map(|v| v[0] + v[1])
                .ok_or(SynthesisError::AssignmentMissing)
        })?;

        // (address + commitment) * 1 = sum
        cs.enforce_constraint(
            lc!() + address + commitment,
            lc!() + Variable::One,
            lc!() + sum,
        )?;

        Ok(())
    }
}

/// Proving and verification keys for [`ClaimBindingCircuit`].
pub struct ClaimCircuitKeys {
    pk: ProvingKey<Bn254>,
}

impl ClaimCircuitKeys {
    /// Run a local (insecure) trusted setup.
    pub fn setup<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, FixtureError> {
        let (pk, _vk) =
            Groth16::<Bn254>::circuit_specific_setup(ClaimBindingCircuit::default(), rng)
                .map_err(|e| FixtureError::Synthesis(e.to_string()))?;
        Ok(Self { pk })
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.pk.vk
    }

    pub fn verifying_key_bytes(&self) -> Result<Vec<u8>, FixtureError> {
        let mut buf = Vec::new();
        self.pk
            .vk
            .serialize_compressed(&mut buf)
            .map_err(|e| FixtureError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Prove the binding for `inputs`, returning compressed proof bytes.
    pub fn prove<R: RngCore + CryptoRng>(
        &self,
        inputs: &PublicInputs,
        rng: &mut R,
    ) -> Result<Vec<u8>, FixtureError> {
        let elements = inputs.to_field_elements();
        let circuit = ClaimBindingCircuit {
            inputs: Some([elements[0], elements[1]]),
        };

        let proof = Groth16::<Bn254>::prove(&self.pk, circuit, rng)
            .map_err(|e| FixtureError::Synthesis(e.to_string()))?;

        let mut buf = Vec::new();
        proof
            .serialize_compressed(&mut buf)
            .map_err(|e| FixtureError::Serialization(e.to_string()))?;
        Ok(buf)
    }
}
