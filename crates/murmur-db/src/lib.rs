//! # murmur-db
//!
//! Persistence for the relay: spent nullifiers, the accepted signal log,
//! registered commitments and daemon settings, in a single SQLite database
//! at `$MURMUR_DATA_DIR/murmur.db`.
//!
//! - WAL mode
//! - All timestamps are Unix epoch seconds
//! - Scalars are stored as 32-byte big-endian blobs
//! - Schema version stored in `PRAGMA user_version`

pub mod migrations;
pub mod queries;
pub mod schema;
pub mod store;

pub use store::SqliteNullifierStore;

use rusqlite::Connection;
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the database at the given path.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

/// Convert a stored blob back to a 32-byte value.
pub(crate) fn hash_from_blob(blob: Vec<u8>) -> Result<[u8; 32]> {
    let len = blob.len();
    blob.try_into()
        .map_err(|_| DbError::Corrupt(format!("expected 32-byte blob, found {len} bytes")))
}
