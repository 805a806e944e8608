//! SQL schema definitions.

/// Complete schema for the v1 database.
pub const SCHEMA_V1: &str = r#"
-- Spent nullifier hashes, scoped by external nullifier.
CREATE TABLE IF NOT EXISTS spent_nullifiers (
    scope BLOB NOT NULL,
    nullifier_hash BLOB NOT NULL,
    accepted_at INTEGER NOT NULL,
    PRIMARY KEY (scope, nullifier_hash)
);

-- Accepted signal log.
CREATE TABLE IF NOT EXISTS signals (
    sequence INTEGER PRIMARY KEY,
    scope BLOB NOT NULL,
    signal TEXT NOT NULL,
    nullifier_hash BLOB NOT NULL,
    root BLOB NOT NULL,
    accepted_at INTEGER NOT NULL,
    UNIQUE (scope, nullifier_hash)
);

CREATE INDEX IF NOT EXISTS idx_signals_scope ON signals(scope);

-- Registered identity commitments in leaf order.
CREATE TABLE IF NOT EXISTS commitments (
    leaf_index INTEGER PRIMARY KEY,
    commitment BLOB NOT NULL UNIQUE,
    registered_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
