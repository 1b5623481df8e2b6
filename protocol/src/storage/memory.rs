//! In-memory registry store. Never fails; state dies with the process.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use super::{RegistryStats, RegistryStore, StoreError, StoreResult};
use crate::crypto::CommitmentHash;
use crate::events::{EventRecord, RegistryEvent};
use crate::identity::{Address, NetworkId};

/// Registry tables held in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    home: Option<NetworkId>,
    linked_commitments: HashSet<CommitmentHash>,
    has_linked: HashSet<Address>,
    verified_addresses: HashSet<Address>,
    events: Vec<EventRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for MemoryStore {
    fn bind_home(&mut self, home: NetworkId) -> StoreResult<()> {
        match self.home {
            Some(stored) if stored != home => Err(StoreError::HomeMismatch {
                stored,
                configured: home,
            }),
            _ => {
                self.home = Some(home);
                Ok(())
            }
        }
    }

    fn is_commitment_linked(&self, commitment: &CommitmentHash) -> StoreResult<bool> {
        Ok(self.linked_commitments.contains(commitment))
    }

    fn has_linked(&self, identity: &Address) -> StoreResult<bool> {
        Ok(self.has_linked.contains(identity))
    }

    fn is_verified(&self, address: &Address) -> StoreResult<bool> {
        Ok(self.verified_addresses.contains(address))
    }

    fn commit(
        &mut self,
        event: RegistryEvent,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<EventRecord> {
        match &event {
            RegistryEvent::CommitmentLinked {
                commitment,
                identity,
            } => {
                self.linked_commitments.insert(*commitment);
                self.has_linked.insert(*identity);
            }
            RegistryEvent::CommitmentImported { commitment, .. } => {
                self.linked_commitments.insert(*commitment);
            }
            RegistryEvent::HumanStatusClaimed {
                derived_address, ..
            } => {
                self.verified_addresses.insert(*derived_address);
            }
        }

        let record = EventRecord {
            sequence: self.events.len() as u64,
            recorded_at,
            event,
        };
        self.events.push(record.clone());
        Ok(record)
    }

    fn events_since(&self, from: u64, limit: usize) -> StoreResult<Vec<EventRecord>> {
        Ok(self
            .events
            .iter()
            .skip(usize::try_from(from).unwrap_or(usize::MAX))
            .take(limit)
            .cloned()
            .collect())
    }

    fn stats(&self) -> StoreResult<RegistryStats> {
        Ok(RegistryStats {
            linked_commitments: self.linked_commitments.len() as u64,
            linked_identities: self.has_linked.len() as u64,
            verified_addresses: self.verified_addresses.len() as u64,
            events: self.events.len() as u64,
        })
    }
}
