//! Spent nullifier queries.

use rusqlite::{Connection, OptionalExtension};

use crate::Result;

/// Record a spent nullifier hash. Returns `false` if it was already spent.
///
/// A single `INSERT OR IGNORE`, so concurrent callers on one database see
/// exactly one success.
pub fn insert_if_absent(
    conn: &Connection,
    scope: &[u8; 32],
    nullifier_hash: &[u8; 32],
    accepted_at: u64,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO spent_nullifiers (scope, nullifier_hash, accepted_at)
         VALUES (?1, ?2, ?3)",
        rusqlite::params![scope.as_slice(), nullifier_hash.as_slice(), accepted_at as i64],
    )?;
    Ok(inserted == 1)
}

pub fn contains(conn: &Connection, scope: &[u8; 32], nullifier_hash: &[u8; 32]) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM spent_nullifiers WHERE scope = ?1 AND nullifier_hash = ?2",
            rusqlite::params![scope.as_slice(), nullifier_hash.as_slice()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Delete a spent nullifier hash. Returns `false` if it was not present.
pub fn remove(conn: &Connection, scope: &[u8; 32], nullifier_hash: &[u8; 32]) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM spent_nullifiers WHERE scope = ?1 AND nullifier_hash = ?2",
        rusqlite::params![scope.as_slice(), nullifier_hash.as_slice()],
    )?;
    Ok(deleted == 1)
}

pub fn count(conn: &Connection, scope: &[u8; 32]) -> Result<u64> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM spent_nullifiers WHERE scope = ?1",
        [scope.as_slice()],
        |row| row.get(0),
    )?;
    Ok(n as u64)
}
