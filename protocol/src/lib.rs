// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # HumanLink Protocol: Core Library
//!
//! Shared building blocks for the HumanLink registry: a cross-network
//! identity registry where a credential holder on one designated "home"
//! network publishes a commitment to a stealth meta-address, and anyone on
//! any network can later redeem a zero-knowledge proof that a one-time
//! address was derived from it.
//!
//! The registry state machine itself lives in `humanlink-contracts`. This
//! crate holds everything it stands on:
//!
//! - **config**: Protocol constants and well-known network identifiers.
//! - **crypto**: Keccak-256 commitments and field-element mapping.
//! - **identity**: Addresses, network ids, call context, meta-addresses,
//!   and the credential-oracle capability.
//! - **zkp**: The proof-verifier capability and its Groth16/BN254 adapter.
//! - **events**: Notifications consumed by the off-core transport layer.
//! - **storage**: Append-only registry tables, in memory or on sled.
//!
//! ## Design Philosophy
//!
//! 1. The registry never interprets a meta-address beyond its length.
//!    Cryptographic correctness is the verifier's job.
//! 2. External contracts are traits injected at construction, so every
//!    guard can be exercised against deterministic test doubles.
//! 3. State is append-only. There is no API to unlink or unverify.

pub mod capability;
pub mod config;
pub mod crypto;
pub mod events;
pub mod identity;
pub mod storage;
pub mod zkp;

pub use capability::CapabilityError;
pub use crypto::CommitmentHash;
pub use events::{EventRecord, RegistryEvent};
pub use identity::{Address, CallContext, CredentialOracle, NetworkId, StealthMetaAddress};
pub use zkp::{ProofVerifier, PublicInputs};
