//! # Storage Module
//!
//! Registry state is three append-only flag tables plus a notification log:
//!
//! ```text
//! linked_commitments   CommitmentHash -> linked
//! has_linked           identity       -> has linked once
//! verified_addresses   derived addr   -> human-verified here
//! events               sequence       -> EventRecord
//! ```
//!
//! Stores never take flag writes directly. They take a [`RegistryEvent`] and
//! apply the flags it implies together with appending the event, as one
//! atomic step. A notification therefore exists if and only if its state
//! change does.
//!
//! ```text
//! memory.rs: MemoryStore: HashSets + Vec, for tests and ephemeral instances
//! db.rs    : RegistryDb: sled trees, one transaction per commit
//! ```

pub mod db;
pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::CommitmentHash;
use crate::events::{EventRecord, RegistryEvent};
use crate::identity::{Address, NetworkId};

pub use db::RegistryDb;
pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store belongs to home network {stored}, registry configured for {configured}")]
    HomeMismatch {
        stored: NetworkId,
        configured: NetworkId,
    },

    #[error("corrupt store: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Row counts of the registry tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub linked_commitments: u64,
    pub linked_identities: u64,
    pub verified_addresses: u64,
    pub events: u64,
}

// ---------------------------------------------------------------------------
// RegistryStore
// ---------------------------------------------------------------------------

/// Persistence backend for one registry instance.
pub trait RegistryStore: Send {
    /// Tie the store to a home network. The first call records it; later
    /// calls with a different network fail with [`StoreError::HomeMismatch`].
    fn bind_home(&mut self, home: NetworkId) -> StoreResult<()>;

    fn is_commitment_linked(&self, commitment: &CommitmentHash) -> StoreResult<bool>;

    fn has_linked(&self, identity: &Address) -> StoreResult<bool>;

    fn is_verified(&self, address: &Address) -> StoreResult<bool>;

    /// Apply the flags implied by `event` and append it to the log, atomically.
    fn commit(&mut self, event: RegistryEvent, recorded_at: DateTime<Utc>)
        -> StoreResult<EventRecord>;

    /// Up to `limit` records with `sequence >= from`, in order.
    fn events_since(&self, from: u64, limit: usize) -> StoreResult<Vec<EventRecord>>;

    /// Table sizes. Runs on every mutation, so implementations answer from
    /// maintained counts rather than by walking tables.
    fn stats(&self) -> StoreResult<RegistryStats>;
}
