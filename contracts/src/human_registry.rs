//! # Human Registry Contract
//!
//! One registry instance per network. On the designated home network a
//! credential holder links a commitment to their stealth meta-address; on any
//! instance, a one-time derived address can then claim human status by
//! presenting a proof against that commitment.
//!
//! ## State Machine
//!
//! ```text
//!   identity:        Unlinked ──link (home only)──> Linked
//!   derived address: Unclaimed ──claim (any net)──> Verified
//! ```
//!
//! Both transitions are terminal. There is no unlink and no unverify.
//!
//! ## Guard Order
//!
//! Guards run in a fixed order and the first failing one decides the error:
//!
//! - `link`: network → meta-address length → already linked → credential
//! - `claim`: null address → commitment linked here → proof
//!
//! `claim` never reaches the verifier for a null address or an unknown
//! commitment. Both "commitment not linked here" and "proof rejected" surface
//! as the same [`RegistryError::InvalidProof`], so a failed claim does not
//! reveal which commitments an instance knows about.
//!
//! ## Cross-Network Commitments
//!
//! Non-home instances learn commitments only through
//! [`HumanRegistry::import_commitment`], called by the configured relayer with
//! hashes it read from the home instance's `CommitmentLinked` notifications.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use humanlink_protocol::config::META_ADDRESS_LENGTH;
use humanlink_protocol::storage::{RegistryStats, RegistryStore, StoreError};
use humanlink_protocol::{
    Address, CallContext, CapabilityError, CommitmentHash, CredentialOracle, EventRecord,
    NetworkId, ProofVerifier, PublicInputs, RegistryEvent,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by registry construction and operations.
///
/// Every error leaves the registry state untouched.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A capability reference or the relayer is the zero address.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// `link` outside the home network, or `import_commitment` on it.
    #[error("wrong network: call executed on {current}, home is {home}")]
    WrongNetwork { current: NetworkId, home: NetworkId },

    #[error("invalid meta-address length: expected {expected} bytes, got {length}", expected = META_ADDRESS_LENGTH)]
    InvalidMetaAddressLength { length: usize },

    #[error("identity {0} has already linked a meta-address")]
    AlreadyLinked(Address),

    #[error("identity {0} holds no human credential")]
    NotVerifiedHuman(Address),

    #[error("derived address is the null address")]
    NullAddress,

    /// The commitment is unknown on this instance or the proof was rejected.
    #[error("invalid proof")]
    InvalidProof,

    #[error("caller {0} is not the configured relayer")]
    UnauthorizedRelayer(Address),

    #[error("credential oracle failed: {0}")]
    CredentialOracle(CapabilityError),

    #[error("proof verifier failed: {0}")]
    ProofVerifier(CapabilityError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl RegistryError {
    /// Stable snake_case label for metrics and API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::InvalidConfiguration(_) => "invalid_configuration",
            RegistryError::WrongNetwork { .. } => "wrong_network",
            RegistryError::InvalidMetaAddressLength { .. } => "invalid_meta_address_length",
            RegistryError::AlreadyLinked(_) => "already_linked",
            RegistryError::NotVerifiedHuman(_) => "not_verified_human",
            RegistryError::NullAddress => "null_address",
            RegistryError::InvalidProof => "invalid_proof",
            RegistryError::UnauthorizedRelayer(_) => "unauthorized_relayer",
            RegistryError::CredentialOracle(_) => "credential_oracle_failure",
            RegistryError::ProofVerifier(_) => "proof_verifier_failure",
            RegistryError::Storage(_) => "storage_failure",
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Construction-time settings of one registry instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// The only network on which `link` is accepted.
    pub home: NetworkId,
    /// Identity allowed to import home commitments into this instance.
    /// `None` disables imports.
    pub relayer: Option<Address>,
}

impl RegistryConfig {
    pub fn new(home: impl Into<NetworkId>) -> Self {
        Self {
            home: home.into(),
            relayer: None,
        }
    }

    pub fn with_relayer(mut self, relayer: Address) -> Self {
        self.relayer = Some(relayer);
        self
    }
}

// ---------------------------------------------------------------------------
// HumanRegistry
// ---------------------------------------------------------------------------

/// The registry state machine for a single network instance.
///
/// Mutating calls take `&mut self`; hosts that share an instance put it
/// behind one lock so calls execute in a total order.
pub struct HumanRegistry<S: RegistryStore> {
    config: RegistryConfig,
    credentials: Arc<dyn CredentialOracle>,
    verifier: Arc<dyn ProofVerifier>,
    store: S,
}

impl<S: RegistryStore> HumanRegistry<S> {
    /// Build a registry over `store`, binding the store to `config.home`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::InvalidConfiguration`] if either capability reports
    ///   the zero address, or the relayer is the zero address.
    /// - [`RegistryError::Storage`] if `store` already belongs to another home.
    pub fn new(
        config: RegistryConfig,
        credentials: Arc<dyn CredentialOracle>,
        verifier: Arc<dyn ProofVerifier>,
        mut store: S,
    ) -> RegistryResult<Self> {
        if credentials.address().is_zero() {
            return Err(RegistryError::InvalidConfiguration(
                "credential contract address is zero".into(),
            ));
        }
        if verifier.address().is_zero() {
            return Err(RegistryError::InvalidConfiguration(
                "verifier contract address is zero".into(),
            ));
        }
        if config.relayer.is_some_and(|r| r.is_zero()) {
            return Err(RegistryError::InvalidConfiguration(
                "relayer address is zero".into(),
            ));
        }

        store.bind_home(config.home)?;

        info!(
            home = %config.home,
            credential_contract = %credentials.address(),
            verifier_contract = %verifier.address(),
            relayer = ?config.relayer,
            "human registry initialized"
        );

        Ok(Self {
            config,
            credentials,
            verifier,
            store,
        })
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Link `ctx.caller` to the commitment of `meta_address`.
    ///
    /// The meta-address is taken as raw bytes so that a wrong length is
    /// reported by this guard rather than by the caller's parser.
    pub fn link(&mut self, ctx: &CallContext, meta_address: &[u8]) -> RegistryResult<EventRecord> {
        if ctx.network != self.config.home {
            debug!(current = %ctx.network, home = %self.config.home, "link rejected: wrong network");
            return Err(RegistryError::WrongNetwork {
                current: ctx.network,
                home: self.config.home,
            });
        }

        if meta_address.len() != META_ADDRESS_LENGTH {
            debug!(length = meta_address.len(), "link rejected: bad meta-address length");
            return Err(RegistryError::InvalidMetaAddressLength {
                length: meta_address.len(),
            });
        }

        if self.store.has_linked(&ctx.caller)? {
            debug!(identity = %ctx.caller, "link rejected: already linked");
            return Err(RegistryError::AlreadyLinked(ctx.caller));
        }

        let credentials = self.credentials.credential_count(&ctx.caller).map_err(|e| {
            warn!(identity = %ctx.caller, error = %e, "credential oracle failed");
            RegistryError::CredentialOracle(e)
        })?;
        if credentials == 0 {
            debug!(identity = %ctx.caller, "link rejected: no credential");
            return Err(RegistryError::NotVerifiedHuman(ctx.caller));
        }

        let commitment = CommitmentHash::of(meta_address);
        let record = self.store.commit(
            RegistryEvent::CommitmentLinked {
                commitment,
                identity: ctx.caller,
            },
            Utc::now(),
        )?;

        info!(
            %commitment,
            identity = %ctx.caller,
            sequence = record.sequence,
            "commitment linked"
        );
        Ok(record)
    }

    /// Record `derived_address` as human-verified on this instance.
    ///
    /// Any caller may submit a claim; the proof is the authorization.
    /// Repeating a claim for an already-verified address verifies the proof
    /// again and emits a fresh notification.
    pub fn claim(
        &mut self,
        derived_address: Address,
        commitment: CommitmentHash,
        proof: &[u8],
    ) -> RegistryResult<EventRecord> {
        if derived_address.is_zero() {
            debug!("claim rejected: null derived address");
            return Err(RegistryError::NullAddress);
        }

        if !self.store.is_commitment_linked(&commitment)? {
            debug!(derived = %derived_address, "claim rejected: invalid proof");
            return Err(RegistryError::InvalidProof);
        }

        let inputs = PublicInputs::for_claim(&derived_address, &commitment);
        let valid = self.verifier.verify(proof, &inputs).map_err(|e| {
            warn!(derived = %derived_address, error = %e, "proof verifier failed");
            RegistryError::ProofVerifier(e)
        })?;
        if !valid {
            debug!(derived = %derived_address, "claim rejected: invalid proof");
            return Err(RegistryError::InvalidProof);
        }

        let record = self.store.commit(
            RegistryEvent::HumanStatusClaimed {
                derived_address,
                commitment,
            },
            Utc::now(),
        )?;

        info!(
            derived = %derived_address,
            %commitment,
            sequence = record.sequence,
            "human status claimed"
        );
        Ok(record)
    }

    /// Make a home-network commitment known to this (non-home) instance.
    ///
    /// Returns `Ok(None)` when the commitment is already linked here.
    pub fn import_commitment(
        &mut self,
        ctx: &CallContext,
        commitment: CommitmentHash,
    ) -> RegistryResult<Option<EventRecord>> {
        if ctx.network == self.config.home {
            debug!(network = %ctx.network, "import rejected: home network");
            return Err(RegistryError::WrongNetwork {
                current: ctx.network,
                home: self.config.home,
            });
        }

        if self.config.relayer != Some(ctx.caller) {
            debug!(caller = %ctx.caller, "import rejected: not the relayer");
            return Err(RegistryError::UnauthorizedRelayer(ctx.caller));
        }

        if self.store.is_commitment_linked(&commitment)? {
            debug!(%commitment, "import skipped: already linked");
            return Ok(None);
        }

        let record = self.store.commit(
            RegistryEvent::CommitmentImported {
                commitment,
                relayer: ctx.caller,
            },
            Utc::now(),
        )?;

        info!(%commitment, relayer = %ctx.caller, sequence = record.sequence, "commitment imported");
        Ok(Some(record))
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Has the commitment of `meta_address` been linked on this instance?
    ///
    /// `false` for any length other than 66 bytes, without touching storage.
    pub fn is_linked_on_chain(&self, meta_address: &[u8]) -> RegistryResult<bool> {
        if meta_address.len() != META_ADDRESS_LENGTH {
            return Ok(false);
        }
        self.is_commitment_linked(&CommitmentHash::of(meta_address))
    }

    /// Has `address` been human-verified on this instance?
    pub fn is_human_on_chain(&self, address: &Address) -> RegistryResult<bool> {
        Ok(self.store.is_verified(address)?)
    }

    pub fn is_commitment_linked(&self, commitment: &CommitmentHash) -> RegistryResult<bool> {
        Ok(self.store.is_commitment_linked(commitment)?)
    }

    pub fn has_linked(&self, identity: &Address) -> RegistryResult<bool> {
        Ok(self.store.has_linked(identity)?)
    }

    /// Page through this instance's notification log.
    pub fn events_since(&self, from: u64, limit: usize) -> RegistryResult<Vec<EventRecord>> {
        Ok(self.store.events_since(from, limit)?)
    }

    pub fn stats(&self) -> RegistryResult<RegistryStats> {
        Ok(self.store.stats()?)
    }

    pub fn home(&self) -> NetworkId {
        self.config.home
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}
