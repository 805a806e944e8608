//! Accepted signal log queries.

use murmur_types::wire::SignalRecord;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::{hash_from_blob, Result};

type RawRecord = (i64, Vec<u8>, String, Vec<u8>, Vec<u8>, i64);

const COLUMNS: &str = "sequence, scope, signal, nullifier_hash, root, accepted_at";

fn raw(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn decode((sequence, scope, signal, nullifier_hash, root, accepted_at): RawRecord) -> Result<SignalRecord> {
    Ok(SignalRecord {
        sequence: sequence as u64,
        round: hash_from_blob(scope)?,
        signal,
        nullifier_hash: hash_from_blob(nullifier_hash)?,
        root: hash_from_blob(root)?,
        accepted_at: accepted_at as u64,
    })
}

/// Append an accepted signal.
pub fn insert(conn: &Connection, record: &SignalRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO signals (sequence, scope, signal, nullifier_hash, root, accepted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            record.sequence as i64,
            record.round.as_slice(),
            record.signal,
            record.nullifier_hash.as_slice(),
            record.root.as_slice(),
            record.accepted_at as i64,
        ],
    )?;
    Ok(())
}

/// The most recently accepted signal.
pub fn latest(conn: &Connection) -> Result<Option<SignalRecord>> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM signals ORDER BY sequence DESC LIMIT 1"),
            [],
            raw,
        )
        .optional()?;
    row.map(decode).transpose()
}

/// Signals accepted in one round, oldest first.
pub fn for_round(conn: &Connection, scope: &[u8; 32], limit: u32) -> Result<Vec<SignalRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM signals WHERE scope = ?1 ORDER BY sequence ASC LIMIT ?2"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params![scope.as_slice(), limit], raw)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(decode).collect()
}

/// Highest sequence number in the log, 0 when empty.
pub fn last_sequence(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COALESCE(MAX(sequence), 0) FROM signals", [], |row| {
        row.get(0)
    })?;
    Ok(n as u64)
}
