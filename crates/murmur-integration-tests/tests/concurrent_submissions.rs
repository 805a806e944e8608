//! Integration test: concurrent submissions against one ledger.
//!
//! 1. The same proof submitted from many tasks is accepted exactly once
//! 2. Distinct members submitting at once are all accepted, in distinct sequence slots
//! 3. Registration racing with proving: a proof for an older root still verifies

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use murmur_ledger::LedgerError;
use murmur_registry::MembershipTree;
use murmur_signal::ExternalNullifier;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_proof_accepted_once() {
    let members = common::members();
    let ledger = Arc::new(common::ledger(&members, ExternalNullifier::from_round(7)));
    let request = Arc::new(common::request(&ledger, &members[1], "race"));
    let mut feed = ledger.subscribe();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ledger = ledger.clone();
            let request = request.clone();
            tokio::task::spawn_blocking(move || ledger.submit(&request))
        })
        .collect();

    let mut accepted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.expect("join") {
            Ok(_) => accepted += 1,
            Err(LedgerError::Rejected("PROOF_REJECTED")) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(rejected, 7);

    assert!(feed.try_next().is_some());
    assert!(feed.try_next().is_none(), "one event per nullifier hash");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_members_all_accepted() {
    let members = common::members();
    let ledger = Arc::new(common::ledger(&members, ExternalNullifier::from_round(8)));
    let requests: Vec<_> = members
        .iter()
        .enumerate()
        .map(|(i, m)| common::request(&ledger, m, &format!("vote {i}")))
        .collect();

    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let ledger = ledger.clone();
            tokio::task::spawn_blocking(move || ledger.submit(&request))
        })
        .collect();

    let mut sequences = HashSet::new();
    for handle in handles {
        let receipt = handle.await.expect("join").expect("accepted");
        sequences.insert(receipt.sequence);
    }
    assert_eq!(sequences, HashSet::from([1, 2, 3]));
    assert_eq!(ledger.latest_signal().map(|s| s.sequence), Some(3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn registration_during_proving() {
    let members = common::members();
    let ledger = Arc::new(common::ledger(&members[..2], ExternalNullifier::from_round(9)));

    let tree = MembershipTree::from_commitments(common::DEPTH, &ledger.commitments())
        .expect("tree");
    let inclusion = tree.proof_for(&members[0].commitment()).expect("inclusion");
    let task = common::prover().prove_in_background(
        members[0].clone(),
        inclusion,
        ledger.current_round(),
        "before the join".to_string(),
    );

    ledger.register(members[2].commitment()).expect("register");
    assert_ne!(ledger.current_root(), tree.root());

    let (proof, outputs) = task.wait().await.expect("proof");
    let request = murmur_types::wire::SubmitRequest {
        signal: "before the join".into(),
        nullifier_hash: outputs.nullifier_hash_bytes(),
        proof: proof.bytes,
        root: Some(outputs.root_bytes()),
    };
    ledger.submit(&request).expect("older root still in window");
}

#[tokio::test]
async fn cancelled_proof_has_no_effect() {
    let members = common::members();
    let ledger = common::ledger(&members, ExternalNullifier::from_round(10));
    let tree = MembershipTree::from_commitments(common::DEPTH, &ledger.commitments())
        .expect("tree");
    let inclusion = tree.proof_for(&members[0].commitment()).expect("inclusion");

    common::prover()
        .prove_in_background(
            members[0].clone(),
            inclusion,
            ledger.current_round(),
            "never sent".to_string(),
        )
        .cancel();

    // The member can still signal in this round.
    let request = common::request(&ledger, &members[0], "sent");
    ledger.submit(&request).expect("accepted");
}
