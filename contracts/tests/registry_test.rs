//! Integration tests for the human registry.
//!
//! Each test drives one or more registry instances through the public API
//! only, with the soulbound credential token as the oracle and a scripted
//! proof verifier.

mod common;

use common::*;
use humanlink_contracts::RegistryError;
use humanlink_protocol::{
    Address, CallContext, CommitmentHash, NetworkId, PublicInputs, RegistryEvent,
};

// ---------------------------------------------------------------------------
// End-to-End Scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_link_once_on_home() {
    let token = credential_token();
    let identity = addr(0x11);
    token.mint(&ISSUER, identity).unwrap();
    let mut home = instance(token, ScriptedVerifier::new());

    let b = blob(0x42);
    assert!(!home.is_linked_on_chain(&b).unwrap());

    let record = home.link(&home_ctx(identity), &b).unwrap();
    assert_eq!(
        record.event,
        RegistryEvent::CommitmentLinked {
            commitment: CommitmentHash::of(&b),
            identity,
        }
    );
    assert!(home.is_linked_on_chain(&b).unwrap());

    let err = home.link(&home_ctx(identity), &b).unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyLinked(a) if a == identity));
}

#[test]
fn scenario_b_claim_on_another_instance() {
    let token = credential_token();
    let identity = addr(0x11);
    token.mint(&ISSUER, identity).unwrap();
    let b = blob(0x42);
    let hash = CommitmentHash::of(&b);

    let mut home = instance(token.clone(), ScriptedVerifier::new());
    home.link(&home_ctx(identity), &b).unwrap();

    let derived = addr(0xAB);
    let proof = b"proof-P".to_vec();
    let verifier = ScriptedVerifier::new();
    verifier.accept(&proof, PublicInputs::for_claim(&derived, &hash));

    let mut remote = instance(token, verifier.clone());
    remote
        .import_commitment(&CallContext::new(BASE, RELAYER), hash)
        .unwrap();

    assert!(!remote.is_human_on_chain(&derived).unwrap());
    let record = remote.claim(derived, hash, &proof).unwrap();
    assert_eq!(
        record.event,
        RegistryEvent::HumanStatusClaimed {
            derived_address: derived,
            commitment: hash,
        }
    );
    assert!(remote.is_human_on_chain(&derived).unwrap());
    assert_eq!(verifier.calls(), 1);

    // Verification is local to the instance that ran the claim.
    assert!(!home.is_human_on_chain(&derived).unwrap());
}

#[test]
fn scenario_c_unlinked_hash_is_invalid_proof() {
    let verifier = ScriptedVerifier::accept_all();
    let mut reg = instance(credential_token(), verifier.clone());

    let err = reg
        .claim(addr(0xAB), CommitmentHash::of(&blob(9)), b"anything")
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidProof));
    assert!(!reg.is_human_on_chain(&addr(0xAB)).unwrap());
}

#[test]
fn scenario_d_null_address_before_verifier() {
    let token = credential_token();
    token.mint(&ISSUER, addr(0x11)).unwrap();
    let verifier = ScriptedVerifier::accept_all();
    let mut reg = instance(token, verifier.clone());
    let b = blob(1);
    reg.link(&home_ctx(addr(0x11)), &b).unwrap();

    let err = reg
        .claim(Address::ZERO, CommitmentHash::of(&b), b"p")
        .unwrap_err();
    assert!(matches!(err, RegistryError::NullAddress));
    assert_eq!(verifier.calls(), 0);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn length_gate_never_errors() {
    let reg = instance(credential_token(), ScriptedVerifier::new());
    for len in [0usize, 1, 20, 32, 64, 65, 67, 132, 1024] {
        assert!(!reg.is_linked_on_chain(&vec![0x42; len]).unwrap(), "len {len}");
    }
}

#[test]
fn link_rejects_every_wrong_length() {
    let token = credential_token();
    token.mint(&ISSUER, addr(0x11)).unwrap();
    let mut reg = instance(token, ScriptedVerifier::new());

    for len in [0usize, 33, 65, 67, 200] {
        let err = reg.link(&home_ctx(addr(0x11)), &vec![1; len]).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidMetaAddressLength { length } if length == len
        ));
    }
    assert!(!reg.has_linked(&addr(0x11)).unwrap());
}

#[test]
fn one_link_per_identity_regardless_of_blob() {
    let token = credential_token();
    token.mint(&ISSUER, addr(0x11)).unwrap();
    let mut reg = instance(token, ScriptedVerifier::new());

    reg.link(&home_ctx(addr(0x11)), &blob(1)).unwrap();
    for byte in 2..6 {
        let err = reg.link(&home_ctx(addr(0x11)), &blob(byte)).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyLinked(_)));
        assert!(!reg.is_linked_on_chain(&blob(byte)).unwrap());
    }
}

#[test]
fn home_only_gate_for_every_caller() {
    let token = credential_token();
    token.mint(&ISSUER, addr(0x11)).unwrap();
    let mut reg = instance(token, ScriptedVerifier::new());

    for network in [BASE, OPTIMISM, NetworkId(31337)] {
        for caller in [addr(0x11), addr(0x22), RELAYER] {
            let err = reg
                .link(&CallContext::new(network, caller), &blob(1))
                .unwrap_err();
            assert!(matches!(
                err,
                RegistryError::WrongNetwork { current, home } if current == network && home == HOME
            ));
        }
    }
    assert_eq!(reg.stats().unwrap().events, 0);
}

#[test]
fn credential_gate_and_revocation() {
    let token = credential_token();
    let mut reg = instance(token.clone(), ScriptedVerifier::new());

    let err = reg.link(&home_ctx(addr(0x11)), &blob(1)).unwrap_err();
    assert!(matches!(err, RegistryError::NotVerifiedHuman(a) if a == addr(0x11)));

    // Revoked before linking: still rejected.
    let id = token.mint(&ISSUER, addr(0x22)).unwrap();
    token.revoke(&ISSUER, id).unwrap();
    let err = reg.link(&home_ctx(addr(0x22)), &blob(2)).unwrap_err();
    assert!(matches!(err, RegistryError::NotVerifiedHuman(_)));

    // Revoked after linking: the link stays.
    let id = token.mint(&ISSUER, addr(0x33)).unwrap();
    reg.link(&home_ctx(addr(0x33)), &blob(3)).unwrap();
    token.revoke(&ISSUER, id).unwrap();
    assert!(reg.is_linked_on_chain(&blob(3)).unwrap());
    assert!(reg.has_linked(&addr(0x33)).unwrap());
}

#[test]
fn proof_gate_on_linked_hash() {
    let token = credential_token();
    token.mint(&ISSUER, addr(0x11)).unwrap();
    let verifier = ScriptedVerifier::new();
    let mut reg = instance(token, verifier.clone());

    let b = blob(7);
    let hash = CommitmentHash::of(&b);
    reg.link(&home_ctx(addr(0x11)), &b).unwrap();

    let good = b"good".to_vec();
    verifier.accept(&good, PublicInputs::for_claim(&addr(0xA1), &hash));

    // Right proof, wrong address.
    let err = reg.claim(addr(0xA2), hash, &good).unwrap_err();
    assert!(matches!(err, RegistryError::InvalidProof));
    // Wrong proof, right address.
    let err = reg.claim(addr(0xA1), hash, b"bad").unwrap_err();
    assert!(matches!(err, RegistryError::InvalidProof));

    reg.claim(addr(0xA1), hash, &good).unwrap();
    assert!(reg.is_human_on_chain(&addr(0xA1)).unwrap());
    assert!(!reg.is_human_on_chain(&addr(0xA2)).unwrap());
    assert_eq!(verifier.calls(), 3);
}

#[test]
fn claim_errors_do_not_distinguish_unknown_hash_from_bad_proof() {
    let token = credential_token();
    token.mint(&ISSUER, addr(0x11)).unwrap();
    let mut reg = instance(token, ScriptedVerifier::new());
    let b = blob(7);
    reg.link(&home_ctx(addr(0x11)), &b).unwrap();

    let unknown = reg
        .claim(addr(0xA1), CommitmentHash::of(&blob(8)), b"p")
        .unwrap_err();
    let rejected = reg.claim(addr(0xA1), CommitmentHash::of(&b), b"p").unwrap_err();

    assert_eq!(unknown.kind(), rejected.kind());
    assert_eq!(unknown.to_string(), rejected.to_string());
}

#[test]
fn reads_are_idempotent() {
    let token = credential_token();
    token.mint(&ISSUER, addr(0x11)).unwrap();
    let mut reg = instance(token, ScriptedVerifier::accept_all());
    let b = blob(5);
    reg.link(&home_ctx(addr(0x11)), &b).unwrap();
    reg.claim(addr(0xA1), CommitmentHash::of(&b), b"p").unwrap();

    let before = reg.stats().unwrap();
    for _ in 0..10 {
        assert!(reg.is_linked_on_chain(&b).unwrap());
        assert!(reg.is_human_on_chain(&addr(0xA1)).unwrap());
        assert!(!reg.is_human_on_chain(&addr(0xA2)).unwrap());
        assert!(!reg.is_linked_on_chain(&blob(6)).unwrap());
    }
    assert_eq!(reg.stats().unwrap(), before);
}

#[test]
fn rejected_calls_leave_no_trace() {
    let token = credential_token();
    token.mint(&ISSUER, addr(0x11)).unwrap();
    let mut reg = instance(token, ScriptedVerifier::new());

    let _ = reg.link(&CallContext::new(BASE, addr(0x11)), &blob(1));
    let _ = reg.link(&home_ctx(addr(0x11)), &[1; 10]);
    let _ = reg.link(&home_ctx(addr(0x99)), &blob(1));
    let _ = reg.claim(Address::ZERO, CommitmentHash::of(&blob(1)), b"");
    let _ = reg.claim(addr(0xA1), CommitmentHash::of(&blob(1)), b"");

    let stats = reg.stats().unwrap();
    assert_eq!(stats.events, 0);
    assert_eq!(stats.linked_commitments, 0);
    assert_eq!(stats.linked_identities, 0);
    assert_eq!(stats.verified_addresses, 0);
    assert!(reg.events_since(0, 10).unwrap().is_empty());
}

#[test]
fn notification_log_is_ordered() {
    let token = credential_token();
    token.mint(&ISSUER, addr(0x11)).unwrap();
    token.mint(&ISSUER, addr(0x22)).unwrap();
    let mut reg = instance(token, ScriptedVerifier::accept_all());

    reg.link(&home_ctx(addr(0x11)), &blob(1)).unwrap();
    reg.link(&home_ctx(addr(0x22)), &blob(2)).unwrap();
    reg.claim(addr(0xA1), CommitmentHash::of(&blob(1)), b"p").unwrap();

    let log = reg.events_since(0, 100).unwrap();
    let names: Vec<_> = log.iter().map(|r| r.event.name()).collect();
    assert_eq!(
        names,
        vec!["commitment_linked", "commitment_linked", "human_status_claimed"]
    );
    assert_eq!(
        log.iter().map(|r| r.sequence).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}
