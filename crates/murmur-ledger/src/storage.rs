//! Durable record of ledger activity.

use std::sync::{Arc, Mutex};

use murmur_db::queries::{commitments, settings, signals};
use murmur_types::wire::SignalRecord;
use murmur_types::Hash;
use rusqlite::Connection;

use crate::{LedgerError, Result};

/// Where the ledger records registrations, rounds and accepted signals.
pub trait LedgerStorage: Send + Sync {
    fn append_signal(&self, record: &SignalRecord) -> Result<()>;

    fn append_commitment(&self, leaf_index: usize, commitment: &Hash) -> Result<()>;

    fn set_round(&self, round: &Hash) -> Result<()>;

    fn latest_signal(&self) -> Result<Option<SignalRecord>>;

    fn last_sequence(&self) -> Result<u64>;
}

/// Keeps nothing; the ledger's in-memory state is the only record.
#[derive(Default)]
pub struct EphemeralStorage;

impl LedgerStorage for EphemeralStorage {
    fn append_signal(&self, _record: &SignalRecord) -> Result<()> {
        Ok(())
    }

    fn append_commitment(&self, _leaf_index: usize, _commitment: &Hash) -> Result<()> {
        Ok(())
    }

    fn set_round(&self, _round: &Hash) -> Result<()> {
        Ok(())
    }

    fn latest_signal(&self) -> Result<Option<SignalRecord>> {
        Ok(None)
    }

    fn last_sequence(&self) -> Result<u64> {
        Ok(0)
    }
}

/// Records into the relay database.
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> murmur_db::Result<T>) -> Result<T> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        f(&conn).map_err(|e| LedgerError::Storage(e.to_string()))
    }
}

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl LedgerStorage for SqliteStorage {
    fn append_signal(&self, record: &SignalRecord) -> Result<()> {
        self.with_conn(|conn| signals::insert(conn, record))
    }

    fn append_commitment(&self, leaf_index: usize, commitment: &Hash) -> Result<()> {
        self.with_conn(|conn| commitments::insert(conn, leaf_index as u64, commitment, now()))
    }

    fn set_round(&self, round: &Hash) -> Result<()> {
        self.with_conn(|conn| settings::set(conn, "current_round", &hex::encode(round)))
    }

    fn latest_signal(&self) -> Result<Option<SignalRecord>> {
        self.with_conn(signals::latest)
    }

    fn last_sequence(&self) -> Result<u64> {
        self.with_conn(signals::last_sequence)
    }
}
