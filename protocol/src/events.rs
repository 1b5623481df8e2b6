//! # Registry Notifications
//!
//! Every successful state change produces exactly one [`RegistryEvent`],
//! committed atomically with the change itself. The notification log is the
//! only channel by which a commitment hash leaves the home network: relayers
//! and indexers read `CommitmentLinked` events and carry the hash to other
//! instances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::CommitmentHash;
use crate::identity::Address;

/// A registry state change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A credential holder linked a meta-address commitment on the home network.
    CommitmentLinked {
        commitment: CommitmentHash,
        identity: Address,
    },
    /// A relayer delivered a home-network commitment to this instance.
    CommitmentImported {
        commitment: CommitmentHash,
        relayer: Address,
    },
    /// A derived address proved it belongs to a linked commitment.
    HumanStatusClaimed {
        derived_address: Address,
        commitment: CommitmentHash,
    },
}

impl RegistryEvent {
    /// The commitment this event concerns.
    pub fn commitment(&self) -> &CommitmentHash {
        match self {
            RegistryEvent::CommitmentLinked { commitment, .. }
            | RegistryEvent::CommitmentImported { commitment, .. }
            | RegistryEvent::HumanStatusClaimed { commitment, .. } => commitment,
        }
    }

    /// Short name used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            RegistryEvent::CommitmentLinked { .. } => "commitment_linked",
            RegistryEvent::CommitmentImported { .. } => "commitment_imported",
            RegistryEvent::HumanStatusClaimed { .. } => "human_status_claimed",
        }
    }
}

/// A notification as stored in an instance's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in this instance's log. Gap-free, starting at 0.
    pub sequence: u64,
    /// When the change was committed.
    pub recorded_at: DateTime<Utc>,
    /// The notification itself.
    pub event: RegistryEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape_is_externally_tagged() {
        let event = RegistryEvent::CommitmentLinked {
            commitment: CommitmentHash::from_bytes([1; 32]),
            identity: Address::from_bytes([2; 20]),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json["commitment_linked"]["identity"],
            format!("0x{}", "02".repeat(20))
        );
    }

    #[test]
    fn record_survives_bincode() {
        let record = EventRecord {
            sequence: 3,
            recorded_at: Utc::now(),
            event: RegistryEvent::HumanStatusClaimed {
                derived_address: Address::from_bytes([9; 20]),
                commitment: CommitmentHash::from_bytes([8; 32]),
            },
        };
        let bytes = bincode::serialize(&record).unwrap();
        let back: EventRecord = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn commitment_accessor_covers_every_variant() {
        let c = CommitmentHash::from_bytes([5; 32]);
        let a = Address::from_bytes([6; 20]);
        let events = [
            RegistryEvent::CommitmentLinked {
                commitment: c,
                identity: a,
            },
            RegistryEvent::CommitmentImported {
                commitment: c,
                relayer: a,
            },
            RegistryEvent::HumanStatusClaimed {
                derived_address: a,
                commitment: c,
            },
        ];
        for event in &events {
            assert_eq!(event.commitment(), &c);
        }
    }
}
