//! # HumanLink Contracts
//!
//! On-chain logic for the HumanLink registry:
//!
//! - **Human Registry**: the per-network state machine. Links a credential
//!   holder's meta-address commitment on the home network and records
//!   proof-backed human status for derived addresses on any network.
//! - **Credential Token**: the soulbound credential the registry consults
//!   before accepting a link.
//!
//! ## Design Principles
//!
//! 1. Guards run in a fixed order and a rejected call changes nothing.
//! 2. State only grows: flags are set once and never cleared.
//! 3. External contracts are reached through capability traits, so the
//!    registry runs unchanged against test doubles or real adapters.
//! 4. Every public event and snapshot type is serializable (serde).

pub mod credential_token;
pub mod human_registry;

pub use credential_token::{CredentialToken, TokenError, TokenId, TokenSnapshot};
pub use human_registry::{HumanRegistry, RegistryConfig, RegistryError, RegistryResult};
