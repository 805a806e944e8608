//! Startup: database, circuit keys and ledger assembly.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context};
use murmur_crypto::poseidon;
use murmur_db::queries::{commitments, settings};
use murmur_db::SqliteNullifierStore;
use murmur_ledger::{Ledger, SqliteStorage};
use murmur_registry::{MembershipSnapshot, MembershipTree};
use murmur_signal::keys::{self, SignalKeys};
use murmur_signal::{ExternalNullifier, SignalVerifier};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::config::DaemonConfig;

pub type SharedConnection = Arc<Mutex<Connection>>;

/// Open (or create) the relay database.
pub fn open_database(config: &DaemonConfig) -> anyhow::Result<SharedConnection> {
    let path = config.db_path();
    let conn = murmur_db::open(&path).with_context(|| format!("opening {}", path.display()))?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Load the verification key for the configured depth.
///
/// With `keys.dev_setup`, missing keys are generated and written first.
pub fn load_verifier(config: &DaemonConfig) -> anyhow::Result<SignalVerifier> {
    let dir = config.keys_dir();
    let depth = config.registry.depth;
    let vk_path = keys::verifying_key_path(&dir, depth);

    if !vk_path.exists() {
        if !config.keys.dev_setup {
            bail!(
                "verification key {} not found; run murmur-keygen --depth {depth}",
                vk_path.display()
            );
        }
        warn!(depth, dir = %dir.display(), "generating development circuit keys");
        SignalKeys::setup(depth)?.save(&dir)?;
    }

    let verifying_key = keys::load_verifying_key(&dir, depth)?;
    info!(depth, path = %vk_path.display(), "verification key loaded");
    Ok(SignalVerifier::new(&verifying_key))
}

/// Rebuild the ledger from the database, seeding it from the configured
/// snapshot on first start.
pub fn build_ledger(
    config: &DaemonConfig,
    conn: SharedConnection,
    verifier: SignalVerifier,
) -> anyhow::Result<Ledger> {
    let depth = config.registry.depth;
    let (stored, round) = {
        let db = conn.lock().map_err(|_| anyhow!("database lock poisoned"))?;
        check_depth(&db, depth)?;
        let stored = commitments::all(&db)?
            .iter()
            .map(poseidon::bytes_to_field)
            .collect::<Result<Vec<_>, _>>()?;
        let round = match settings::get_opt(&db, "current_round")? {
            Some(raw) => decode_round(&raw)?,
            None => config.round.external_nullifier(),
        };
        (stored, round)
    };

    let tree = MembershipTree::from_commitments(depth, &stored)?;
    let ledger = Ledger::new(tree, round, verifier)
        .with_root_history(config.registry.root_history)
        .with_nullifier_store(Arc::new(SqliteNullifierStore::new(conn.clone())))
        .with_storage(Arc::new(SqliteStorage::new(conn)))?;

    if stored.is_empty() {
        if let Some(path) = config.snapshot_path() {
            let snapshot = MembershipSnapshot::load(&path)?;
            if let Some(file_depth) = snapshot.depth {
                if file_depth != depth {
                    bail!(
                        "snapshot {} has depth {file_depth}, configured depth is {depth}",
                        path.display()
                    );
                }
            }
            for commitment in snapshot.commitments {
                ledger.register(commitment)?;
            }
        }
    }

    info!(
        depth,
        members = ledger.commitments().len(),
        root = %poseidon::to_hex(&ledger.current_root()),
        round = %ledger.current_round(),
        "ledger ready"
    );
    Ok(ledger)
}

/// Refuse to reopen a database built for another tree depth.
fn check_depth(db: &Connection, depth: usize) -> anyhow::Result<()> {
    match settings::get_opt(db, "tree_depth")? {
        Some(stored) => {
            let stored: usize = stored
                .parse()
                .with_context(|| format!("corrupt tree_depth setting {stored:?}"))?;
            if stored != depth {
                bail!("database was created with tree depth {stored}, configured depth is {depth}");
            }
        }
        None => settings::set(db, "tree_depth", &depth.to_string())?,
    }
    Ok(())
}

fn decode_round(raw: &str) -> anyhow::Result<ExternalNullifier> {
    let bytes: [u8; 32] = hex::decode(raw)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| anyhow!("corrupt current_round setting {raw:?}"))?;
    Ok(ExternalNullifier::from_bytes(&bytes)?)
}
