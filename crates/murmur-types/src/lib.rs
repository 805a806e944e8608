//! # murmur-types
//!
//! Shared domain types used across the Murmur workspace: the canonical
//! signal encoding and the structures that cross the relay / ledger boundary.

pub mod events;
pub mod signal;
pub mod wire;

/// A 32-byte big-endian scalar encoding (root, commitment, nullifier hash).
pub type Hash = [u8; 32];

/// Default Merkle tree depth (capacity 2^20 members).
pub const DEFAULT_TREE_DEPTH: usize = 20;

/// Largest supported Merkle tree depth.
pub const MAX_TREE_DEPTH: usize = 32;

/// Width of the fixed signal field in bytes.
pub const SIGNAL_FIELD_BYTES: usize = 32;

/// Maximum signal payload; one byte of the field is reserved as terminator.
pub const MAX_SIGNAL_BYTES: usize = SIGNAL_FIELD_BYTES - 1;

/// Default number of recent roots the verifier accepts.
pub const DEFAULT_ROOT_HISTORY: usize = 32;
