//! Shared fixtures: one key pair per test binary, deterministic members.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use murmur_identity::{derive_identity, Identity};
use murmur_ledger::{Ledger, SqliteStorage};
use murmur_registry::MembershipTree;
use murmur_signal::{ExternalNullifier, SignalKeys, SignalProver, SignalVerifier};
use murmur_types::wire::SubmitRequest;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rusqlite::Connection;

pub const DEPTH: usize = 2;

pub fn keys() -> &'static SignalKeys {
    static KEYS: OnceLock<SignalKeys> = OnceLock::new();
    KEYS.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(2024);
        SignalKeys::setup_with_rng(DEPTH, &mut rng).expect("setup")
    })
}

pub fn prover() -> SignalProver {
    SignalProver::from_keys(keys())
}

pub fn verifier() -> SignalVerifier {
    SignalVerifier::new(&keys().verifying_key)
}

pub fn member(secret: &str) -> Identity {
    derive_identity(secret.as_bytes()).expect("derive identity")
}

/// c0, c1, c2 of the three-member scenario.
pub fn members() -> Vec<Identity> {
    ["c0", "c1", "c2"].iter().map(|s| member(s)).collect()
}

/// An in-memory ledger with `members` registered in order.
pub fn ledger(members: &[Identity], round: ExternalNullifier) -> Ledger {
    let ledger = Ledger::new(MembershipTree::new(DEPTH).expect("tree"), round, verifier());
    for m in members {
        ledger.register(m.commitment()).expect("register");
    }
    ledger
}

/// A ledger over a SQLite connection.
pub fn sqlite_ledger(conn: Arc<Mutex<Connection>>, round: ExternalNullifier) -> Ledger {
    let commitments = {
        let db = conn.lock().expect("lock");
        murmur_db::queries::commitments::all(&db)
            .expect("commitments")
            .iter()
            .map(|b| murmur_crypto::poseidon::bytes_to_field(b).expect("scalar"))
            .collect::<Vec<_>>()
    };
    let tree = MembershipTree::from_commitments(DEPTH, &commitments).expect("tree");
    Ledger::new(tree, round, verifier())
        .with_nullifier_store(Arc::new(murmur_db::SqliteNullifierStore::new(conn.clone())))
        .with_storage(Arc::new(SqliteStorage::new(conn)))
        .expect("storage")
}

/// Prove `signal` for `member` against the ledger's current registry and round.
pub fn request(ledger: &Ledger, member: &Identity, signal: &str) -> SubmitRequest {
    let tree =
        MembershipTree::from_commitments(ledger.depth(), &ledger.commitments()).expect("tree");
    let inclusion = tree.proof_for(&member.commitment()).expect("inclusion");
    let (proof, outputs) = prover()
        .prove(member, &inclusion, ledger.current_round(), signal)
        .expect("prove");
    SubmitRequest {
        signal: signal.to_string(),
        nullifier_hash: outputs.nullifier_hash_bytes(),
        proof: proof.bytes,
        root: Some(outputs.root_bytes()),
    }
}

/// A fresh database file under the system temp dir.
pub fn temp_db_path() -> PathBuf {
    std::env::temp_dir().join(format!("murmur_it_{}.db", rand::random::<u64>()))
}

pub fn remove_db(path: &PathBuf) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}
