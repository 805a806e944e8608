//! # murmur-nullifier
//!
//! One-signal-per-round enforcement via nullifier tracking.
//!
//! A nullifier hash is deterministic per (identity, round) and reveals
//! nothing but repetition. Accepted hashes are recorded in a spent set
//! scoped by external nullifier; a second signal from the same member in the
//! same round produces the same hash and is refused.
//!
//! ## Modules
//!
//! - [`memory`] — In-process spent set

pub mod memory;

pub use memory::MemoryNullifierStore;

use murmur_crypto::{poseidon, Fr};

/// A nullifier hash (32-byte big-endian scalar).
pub type Nullifier = [u8; 32];

/// A spent-set scope: the 32-byte encoding of an external nullifier.
pub type Scope = [u8; 32];

/// Error types for nullifier operations.
#[derive(Debug, thiserror::Error)]
pub enum NullifierError {
    /// Backing store failure.
    #[error("nullifier store error: {0}")]
    Store(String),
}

/// Convenience result type for nullifier operations.
pub type Result<T> = std::result::Result<T, NullifierError>;

/// A spent-nullifier set shared by all verifications.
///
/// `insert_if_absent` must be atomic per `(scope, nullifier)`: of any number
/// of concurrent inserts of the same pair exactly one returns `true`.
pub trait NullifierStore: Send + Sync {
    /// Whether `nullifier` is spent in `scope`.
    fn contains(&self, scope: &Scope, nullifier: &Nullifier) -> Result<bool>;

    /// Mark `nullifier` spent in `scope`. Returns `false` if it already was.
    fn insert_if_absent(&self, scope: &Scope, nullifier: &Nullifier) -> Result<bool>;

    /// Number of nullifiers spent in `scope`.
    fn count(&self, scope: &Scope) -> Result<usize>;

    /// Unmark `nullifier` in `scope`. Returns `false` if it was not spent.
    ///
    /// Only for undoing an insert whose acceptance could not be recorded.
    fn remove(&self, scope: &Scope, nullifier: &Nullifier) -> Result<bool>;
}

/// Derive the nullifier hash of a member for one round.
///
/// `nullifier_hash = Poseidon(nullifier_secret, external_nullifier)`
pub fn derive_nullifier_hash(nullifier_secret: Fr, external_nullifier: Fr) -> Fr {
    poseidon::hash(nullifier_secret, external_nullifier)
}
