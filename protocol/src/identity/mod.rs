//! # Identity Module
//!
//! Who is calling, on which network, and what they are committing to.
//!
//! 1. **Address**: 20-byte account identifiers; the zero address is null.
//! 2. **NetworkId / CallContext**: the explicit execution context of a
//!    registry call, so the home-network guard never reads a global.
//! 3. **StealthMetaAddress**: the 66-byte spend+view key blob a credential
//!    holder commits to.
//! 4. **CredentialOracle**: the capability that answers "is this address a
//!    verified human on the home network?".

pub mod address;
pub mod credential;
pub mod meta_address;

pub use address::{Address, CallContext, NetworkId, ParseError};
pub use credential::CredentialOracle;
pub use meta_address::{decode_meta_address_bytes, MetaAddressError, StealthMetaAddress};
