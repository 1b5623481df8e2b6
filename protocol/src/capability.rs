//! # Capability Errors
//!
//! The registry depends on two external contracts: a credential oracle and a
//! proof verifier. Both are called synchronously and are either available or
//! failing outright. A failure is a hard error that aborts the registry call
//! with no state change; the core never retries.

use thiserror::Error;

/// A failure inside an external capability, as opposed to a negative answer.
///
/// "This address holds zero credentials" and "this proof does not verify"
/// are answers. `CapabilityError` means no answer could be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// The capability could not be reached or is not serving requests.
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    /// The capability failed while computing its answer.
    #[error("capability internal failure: {0}")]
    Internal(String),
}
