//! # Credential Oracle Capability
//!
//! On the home network, only addresses holding at least one non-transferable
//! "human" credential may link a meta-address. The registry asks an external
//! credential contract through this trait and never caches the answer.

use super::address::Address;
use crate::capability::CapabilityError;

/// Read-only view of an external credential (soulbound token) contract.
pub trait CredentialOracle: Send + Sync {
    /// Address of the credential contract. The zero address means "not
    /// configured" and is rejected at registry construction.
    fn address(&self) -> Address;

    /// Number of credential tokens held by `owner`.
    fn credential_count(&self, owner: &Address) -> Result<u64, CapabilityError>;
}
