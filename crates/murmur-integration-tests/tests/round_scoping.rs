//! Integration test: external nullifiers scope the spent set.
//!
//! 1. One member signals once per round; the nullifier hash differs per round
//! 2. A proof made for one round is refused after the ledger moves on
//! 3. Numbered rounds and named topics never collide

mod common;

use murmur_ledger::LedgerError;
use murmur_nullifier::derive_nullifier_hash;
use murmur_signal::ExternalNullifier;

#[test]
fn one_signal_per_member_per_round() {
    let members = common::members();
    let ledger = common::ledger(&members, ExternalNullifier::from_round(1));

    let first = common::request(&ledger, &members[0], "round one");
    ledger.submit(&first).expect("accepted");
    let again = common::request(&ledger, &members[0], "round one again");
    assert!(matches!(
        ledger.submit(&again),
        Err(LedgerError::Rejected("PROOF_REJECTED"))
    ));

    ledger
        .advance_round(ExternalNullifier::from_round(2))
        .expect("advance");
    let second = common::request(&ledger, &members[0], "round two");
    assert_ne!(first.nullifier_hash, second.nullifier_hash);
    let receipt = ledger.submit(&second).expect("accepted in the new round");
    assert_eq!(receipt.round, ExternalNullifier::from_round(2).to_bytes());
}

#[test]
fn stale_round_proof_refused() {
    let members = common::members();
    let ledger = common::ledger(&members, ExternalNullifier::from_topic("poll-a"));
    let stale = common::request(&ledger, &members[1], "yes");

    ledger
        .advance_round(ExternalNullifier::from_topic("poll-b"))
        .expect("advance");
    assert!(matches!(
        ledger.submit(&stale),
        Err(LedgerError::Rejected("PROOF_REJECTED"))
    ));
    assert!(ledger.latest_signal().is_none());
}

#[test]
fn rounds_and_topics_are_distinct() {
    let member = common::member("scoping");
    let by_number = ExternalNullifier::from_round(1);
    let by_topic = ExternalNullifier::from_topic("1");
    assert_ne!(by_number, by_topic);
    assert_ne!(
        derive_nullifier_hash(member.nullifier_secret(), by_number.as_field()),
        derive_nullifier_hash(member.nullifier_secret(), by_topic.as_field())
    );
}
