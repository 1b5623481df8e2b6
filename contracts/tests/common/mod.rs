//! Shared test doubles and fixtures for the contract integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use humanlink_contracts::{CredentialToken, HumanRegistry, RegistryConfig};
use humanlink_protocol::storage::MemoryStore;
use humanlink_protocol::{
    Address, CallContext, CapabilityError, NetworkId, ProofVerifier, PublicInputs,
};

pub const HOME: NetworkId = NetworkId(1);
pub const BASE: NetworkId = NetworkId(8453);
pub const OPTIMISM: NetworkId = NetworkId(10);

pub const ISSUER: Address = Address::from_bytes([0x1A; 20]);
pub const CREDENTIAL_CONTRACT: Address = Address::from_bytes([0xC0; 20]);
pub const VERIFIER_CONTRACT: Address = Address::from_bytes([0xD0; 20]);
pub const RELAYER: Address = Address::from_bytes([0xEE; 20]);

pub fn addr(byte: u8) -> Address {
    Address::from_bytes([byte; 20])
}

pub fn blob(byte: u8) -> Vec<u8> {
    vec![byte; 66]
}

pub fn home_ctx(caller: Address) -> CallContext {
    CallContext::new(HOME, caller)
}

/// A verifier that accepts exactly the `(proof, inputs)` pairs it was told
/// about, or everything when built with [`ScriptedVerifier::accept_all`].
pub struct ScriptedVerifier {
    accept_all: bool,
    accepted: Mutex<HashSet<(Vec<u8>, PublicInputs)>>,
    calls: AtomicUsize,
}

impl ScriptedVerifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            accept_all: false,
            accepted: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn accept_all() -> Arc<Self> {
        Arc::new(Self {
            accept_all: true,
            accepted: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn accept(&self, proof: &[u8], inputs: PublicInputs) {
        self.accepted.lock().insert((proof.to_vec(), inputs));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProofVerifier for ScriptedVerifier {
    fn address(&self) -> Address {
        VERIFIER_CONTRACT
    }

    fn verify(&self, proof: &[u8], inputs: &PublicInputs) -> Result<bool, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.accept_all || self.accepted.lock().contains(&(proof.to_vec(), *inputs)))
    }
}

pub fn credential_token() -> Arc<CredentialToken> {
    Arc::new(CredentialToken::new(
        CREDENTIAL_CONTRACT,
        ISSUER,
        "Proof of Human",
        "POH",
    ))
}

/// A fresh registry instance with its own store, homed on [`HOME`].
pub fn instance(
    token: Arc<CredentialToken>,
    verifier: Arc<ScriptedVerifier>,
) -> HumanRegistry<MemoryStore> {
    HumanRegistry::new(
        RegistryConfig::new(HOME).with_relayer(RELAYER),
        token,
        verifier,
        MemoryStore::new(),
    )
    .unwrap()
}
