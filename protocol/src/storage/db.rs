//! # RegistryDb: Persistent Registry Store
//!
//! sled-backed tables for one registry instance. Each table is a named sled
//! tree:
//!
//! | Tree                 | Key                    | Value                 |
//! |----------------------|------------------------|-----------------------|
//! | `linked_commitments` | commitment (32B)       | `0x01`                |
//! | `has_linked`         | identity address (20B) | `0x01`                |
//! | `verified_addresses` | derived address (20B)  | `0x01`                |
//! | `events`             | sequence (8B BE)       | `bincode(EventRecord)`|
//! | `metadata`           | key (UTF-8)            | value (bytes)         |
//!
//! Sequences are big-endian so sled's lexicographic order is log order.
//!
//! ## Atomicity
//!
//! `commit` runs a single transaction across all five trees: the flag writes,
//! the log append, and the sequence counter bump land together or not at all.
//!
//! Row counts live in `metadata` and move inside the same transaction, so
//! `stats` is a handful of point reads. sled's `Tree::len` walks the whole
//! tree and is never used on a request path.

use chrono::{DateTime, Utc};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionalTree,
};
use sled::{Db, Transactional, Tree};
use std::path::Path;

use super::{RegistryStats, RegistryStore, StoreError, StoreResult};
use crate::crypto::CommitmentHash;
use crate::events::{EventRecord, RegistryEvent};
use crate::identity::{Address, NetworkId};

// ---------------------------------------------------------------------------
// Metadata Keys
// ---------------------------------------------------------------------------

/// Home network the store was first bound to (8B BE).
const META_HOME_NETWORK: &[u8] = b"home_network";

/// Sequence number the next event will get (8B BE).
const META_NEXT_SEQUENCE: &[u8] = b"next_sequence";

/// Row counters of the flag tables (8B BE each).
const META_LINKED_COMMITMENTS: &[u8] = b"count_linked_commitments";
const META_LINKED_IDENTITIES: &[u8] = b"count_linked_identities";
const META_VERIFIED_ADDRESSES: &[u8] = b"count_verified_addresses";

/// Value stored for every set flag. Flags are never unset.
const FLAG_SET: &[u8] = &[1];

fn decode_u64(bytes: &[u8], what: &str) -> StoreResult<u64> {
    let array: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Corrupt(format!("{} is {} bytes, expected 8", what, bytes.len())))?;
    Ok(u64::from_be_bytes(array))
}

/// Increment a row counter inside a transaction.
fn bump(
    metadata: &TransactionalTree,
    key: &'static [u8],
) -> ConflictableTransactionResult<(), StoreError> {
    let current = match metadata.get(key)? {
        Some(bytes) => {
            decode_u64(&bytes, "row counter").map_err(ConflictableTransactionError::Abort)?
        }
        None => 0,
    };
    metadata.insert(key, &(current + 1).to_be_bytes()[..])?;
    Ok(())
}

// ---------------------------------------------------------------------------
// RegistryDb
// ---------------------------------------------------------------------------

/// sled-backed [`RegistryStore`].
///
/// Cheap to clone; clones share the same underlying database.
#[derive(Debug, Clone)]
pub struct RegistryDb {
    db: Db,
    linked_commitments: Tree,
    has_linked: Tree,
    verified_addresses: Tree,
    events: Tree,
    metadata: Tree,
}

impl RegistryDb {
    /// Open or create a store at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A store that lives in a temporary location and is removed on drop.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let store = Self {
            linked_commitments: db.open_tree("linked_commitments")?,
            has_linked: db.open_tree("has_linked")?,
            verified_addresses: db.open_tree("verified_addresses")?,
            events: db.open_tree("events")?,
            metadata: db.open_tree("metadata")?,
            db,
        };
        store.seed_counters()?;
        Ok(store)
    }

    /// Count a flag table once if its counter was never written, e.g. for a
    /// database created before counters existed.
    fn seed_counters(&self) -> StoreResult<()> {
        for (key, tree) in [
            (META_LINKED_COMMITMENTS, &self.linked_commitments),
            (META_LINKED_IDENTITIES, &self.has_linked),
            (META_VERIFIED_ADDRESSES, &self.verified_addresses),
        ] {
            if self.metadata.get(key)?.is_none() {
                let rows = tree.len() as u64;
                self.metadata.insert(key, &rows.to_be_bytes()[..])?;
            }
        }
        Ok(())
    }

    fn counter(&self, key: &[u8], what: &str) -> StoreResult<u64> {
        match self.metadata.get(key)? {
            Some(bytes) => decode_u64(&bytes, what),
            None => Ok(0),
        }
    }

    /// The home network recorded by [`RegistryStore::bind_home`], if any.
    pub fn home_network(&self) -> StoreResult<Option<NetworkId>> {
        match self.metadata.get(META_HOME_NETWORK)? {
            Some(bytes) => Ok(Some(NetworkId(decode_u64(&bytes, "home_network")?))),
            None => Ok(None),
        }
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl RegistryStore for RegistryDb {
    fn bind_home(&mut self, home: NetworkId) -> StoreResult<()> {
        match self.home_network()? {
            Some(stored) if stored != home => Err(StoreError::HomeMismatch {
                stored,
                configured: home,
            }),
            Some(_) => Ok(()),
            None => {
                self.metadata
                    .insert(META_HOME_NETWORK, &home.0.to_be_bytes()[..])?;
                self.flush()
            }
        }
    }

    fn is_commitment_linked(&self, commitment: &CommitmentHash) -> StoreResult<bool> {
        Ok(self.linked_commitments.contains_key(commitment.as_bytes())?)
    }

    fn has_linked(&self, identity: &Address) -> StoreResult<bool> {
        Ok(self.has_linked.contains_key(identity.as_bytes())?)
    }

    fn is_verified(&self, address: &Address) -> StoreResult<bool> {
        Ok(self.verified_addresses.contains_key(address.as_bytes())?)
    }

    fn commit(
        &mut self,
        event: RegistryEvent,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<EventRecord> {
        let trees = (
            &self.linked_commitments,
            &self.has_linked,
            &self.verified_addresses,
            &self.events,
            &self.metadata,
        );

        let outcome = trees.transaction(
            |(commitments, identities, verified, events, metadata)| -> ConflictableTransactionResult<EventRecord, StoreError> {
                let sequence = match metadata.get(META_NEXT_SEQUENCE)? {
                    Some(bytes) => decode_u64(&bytes, "next_sequence")
                        .map_err(ConflictableTransactionError::Abort)?,
                    None => 0,
                };

                match &event {
                    RegistryEvent::CommitmentLinked {
                        commitment,
                        identity,
                    } => {
                        if commitments.insert(&commitment.as_bytes()[..], FLAG_SET)?.is_none() {
                            bump(metadata, META_LINKED_COMMITMENTS)?;
                        }
                        if identities.insert(&identity.as_bytes()[..], FLAG_SET)?.is_none() {
                            bump(metadata, META_LINKED_IDENTITIES)?;
                        }
                    }
                    RegistryEvent::CommitmentImported { commitment, .. } => {
                        if commitments.insert(&commitment.as_bytes()[..], FLAG_SET)?.is_none() {
                            bump(metadata, META_LINKED_COMMITMENTS)?;
                        }
                    }
                    RegistryEvent::HumanStatusClaimed {
                        derived_address, ..
                    } => {
                        // A repeated claim re-sets the flag without adding a row.
                        if verified.insert(&derived_address.as_bytes()[..], FLAG_SET)?.is_none() {
                            bump(metadata, META_VERIFIED_ADDRESSES)?;
                        }
                    }
                }

                let record = EventRecord {
                    sequence,
                    recorded_at,
                    event: event.clone(),
                };
                let bytes = bincode::serialize(&record).map_err(|e| {
                    ConflictableTransactionError::Abort(StoreError::Serialization(e.to_string()))
                })?;

                events.insert(&sequence.to_be_bytes()[..], bytes)?;
                metadata.insert(META_NEXT_SEQUENCE, &(sequence + 1).to_be_bytes()[..])?;

                Ok(record)
            },
        );

        let record = outcome.map_err(|e| match e {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => StoreError::Sled(err),
        })?;

        self.flush()?;
        Ok(record)
    }

    fn events_since(&self, from: u64, limit: usize) -> StoreResult<Vec<EventRecord>> {
        let mut records = Vec::new();
        for entry in self.events.range(from.to_be_bytes()..).take(limit) {
            let (_, bytes) = entry?;
            let record: EventRecord = bincode::deserialize(&bytes)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            records.push(record);
        }
        Ok(records)
    }

    fn stats(&self) -> StoreResult<RegistryStats> {
        Ok(RegistryStats {
            linked_commitments: self.counter(META_LINKED_COMMITMENTS, "linked commitment count")?,
            linked_identities: self.counter(META_LINKED_IDENTITIES, "linked identity count")?,
            verified_addresses: self.counter(META_VERIFIED_ADDRESSES, "verified address count")?,
            // The log is gap-free from 0, so its length is the next sequence.
            events: self.counter(META_NEXT_SEQUENCE, "next_sequence")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claimed(byte: u8) -> RegistryEvent {
        RegistryEvent::HumanStatusClaimed {
            derived_address: Address::from_bytes([byte; 20]),
            commitment: CommitmentHash::from_bytes([byte; 32]),
        }
    }

    #[test]
    fn commit_link_sets_flags_and_appends_event() {
        let mut db = RegistryDb::open_temporary().unwrap();
        let event = RegistryEvent::CommitmentLinked {
            commitment: CommitmentHash::from_bytes([1; 32]),
            identity: Address::from_bytes([2; 20]),
        };

        let record = db.commit(event.clone(), Utc::now()).unwrap();
        assert_eq!(record.sequence, 0);
        assert_eq!(record.event, event);

        assert!(db
            .is_commitment_linked(&CommitmentHash::from_bytes([1; 32]))
            .unwrap());
        assert!(db.has_linked(&Address::from_bytes([2; 20])).unwrap());
        assert_eq!(db.events_since(0, 10).unwrap(), vec![record]);
    }

    #[test]
    fn sequences_are_gap_free() {
        let mut db = RegistryDb::open_temporary().unwrap();
        for i in 0..4 {
            let record = db.commit(claimed(i), Utc::now()).unwrap();
            assert_eq!(record.sequence, u64::from(i));
        }

        let page = db.events_since(1, 2).unwrap();
        assert_eq!(
            page.iter().map(|r| r.sequence).collect::<Vec<_>>(),
            vec![1, 2]
        );

        let stats = db.stats().unwrap();
        assert_eq!(stats.verified_addresses, 4);
        assert_eq!(stats.events, 4);
        assert_eq!(stats.linked_commitments, 0);
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut db = RegistryDb::open(dir.path()).unwrap();
            db.bind_home(NetworkId(1)).unwrap();
            db.commit(claimed(9), Utc::now()).unwrap();
        }

        let mut db = RegistryDb::open(dir.path()).unwrap();
        assert_eq!(db.home_network().unwrap(), Some(NetworkId(1)));
        assert!(db.is_verified(&Address::from_bytes([9; 20])).unwrap());

        // The counter continues where it left off.
        let record = db.commit(claimed(10), Utc::now()).unwrap();
        assert_eq!(record.sequence, 1);
    }

    #[test]
    fn stats_track_distinct_rows_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut db = RegistryDb::open(dir.path()).unwrap();
            db.commit(claimed(1), Utc::now()).unwrap();
            db.commit(claimed(1), Utc::now()).unwrap();
            db.commit(
                RegistryEvent::CommitmentLinked {
                    commitment: CommitmentHash::from_bytes([3; 32]),
                    identity: Address::from_bytes([4; 20]),
                },
                Utc::now(),
            )
            .unwrap();
            db.commit(
                RegistryEvent::CommitmentImported {
                    commitment: CommitmentHash::from_bytes([3; 32]),
                    relayer: Address::from_bytes([0xEE; 20]),
                },
                Utc::now(),
            )
            .unwrap();
        }

        let db = RegistryDb::open(dir.path()).unwrap();
        assert_eq!(
            db.stats().unwrap(),
            RegistryStats {
                linked_commitments: 1,
                linked_identities: 1,
                verified_addresses: 1,
                events: 4,
            }
        );
    }

    #[test]
    fn missing_counters_are_seeded_on_open() {
        let mut db = RegistryDb::open_temporary().unwrap();
        db.commit(claimed(1), Utc::now()).unwrap();
        db.commit(claimed(2), Utc::now()).unwrap();
        db.metadata.remove(META_VERIFIED_ADDRESSES).unwrap();

        let reopened = RegistryDb::from_db(db.db.clone()).unwrap();
        assert_eq!(reopened.stats().unwrap().verified_addresses, 2);

        let mut reopened = reopened;
        reopened.commit(claimed(3), Utc::now()).unwrap();
        assert_eq!(reopened.stats().unwrap().verified_addresses, 3);
    }

    #[test]
    fn bind_home_rejects_other_network() {
        let mut db = RegistryDb::open_temporary().unwrap();
        db.bind_home(NetworkId(1)).unwrap();
        db.bind_home(NetworkId(1)).unwrap();

        let err = db.bind_home(NetworkId(8453)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::HomeMismatch {
                stored: NetworkId(1),
                configured: NetworkId(8453)
            }
        ));
    }
}
