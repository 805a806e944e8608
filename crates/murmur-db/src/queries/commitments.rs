//! Registered commitment queries.

use rusqlite::Connection;

use crate::{hash_from_blob, Result};

/// Record the commitment at `leaf_index`.
pub fn insert(
    conn: &Connection,
    leaf_index: u64,
    commitment: &[u8; 32],
    registered_at: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO commitments (leaf_index, commitment, registered_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![leaf_index as i64, commitment.as_slice(), registered_at as i64],
    )?;
    Ok(())
}

/// All commitments in leaf order.
pub fn all(conn: &Connection) -> Result<Vec<[u8; 32]>> {
    let mut stmt = conn.prepare("SELECT commitment FROM commitments ORDER BY leaf_index ASC")?;
    let blobs = stmt
        .query_map([], |row| row.get::<_, Vec<u8>>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    blobs.into_iter().map(hash_from_blob).collect()
}

pub fn count(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM commitments", [], |row| row.get(0))?;
    Ok(n as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_list_in_order() {
        let conn = crate::open_memory().expect("open");
        insert(&conn, 1, &[2; 32], 10).expect("insert");
        insert(&conn, 0, &[1; 32], 10).expect("insert");
        assert_eq!(all(&conn).expect("all"), vec![[1; 32], [2; 32]]);
        assert_eq!(count(&conn).expect("count"), 2);
    }

    #[test]
    fn test_duplicate_commitment_rejected() {
        let conn = crate::open_memory().expect("open");
        insert(&conn, 0, &[1; 32], 10).expect("insert");
        assert!(insert(&conn, 1, &[1; 32], 10).is_err());
    }
}
