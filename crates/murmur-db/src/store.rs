//! SQLite-backed spent set.

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use murmur_nullifier::{Nullifier, NullifierError, NullifierStore, Scope};
use rusqlite::Connection;

use crate::queries::nullifiers;

/// Spent nullifiers persisted in the `spent_nullifiers` table.
#[derive(Clone)]
pub struct SqliteNullifierStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteNullifierStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> crate::Result<T>) -> murmur_nullifier::Result<T> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        f(&conn).map_err(|e| NullifierError::Store(e.to_string()))
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl NullifierStore for SqliteNullifierStore {
    fn contains(&self, scope: &Scope, nullifier: &Nullifier) -> murmur_nullifier::Result<bool> {
        self.with_conn(|conn| nullifiers::contains(conn, scope, nullifier))
    }

    fn insert_if_absent(
        &self,
        scope: &Scope,
        nullifier: &Nullifier,
    ) -> murmur_nullifier::Result<bool> {
        self.with_conn(|conn| nullifiers::insert_if_absent(conn, scope, nullifier, now()))
    }

    fn remove(&self, scope: &Scope, nullifier: &Nullifier) -> murmur_nullifier::Result<bool> {
        self.with_conn(|conn| nullifiers::remove(conn, scope, nullifier))
    }

    fn count(&self, scope: &Scope) -> murmur_nullifier::Result<usize> {
        self.with_conn(|conn| nullifiers::count(conn, scope).map(|n| n as usize))
    }
}
