//! # murmur-registry
//!
//! The membership registry: an append-only, fixed-depth Poseidon Merkle tree
//! of identity commitments, inclusion-path generation, and the window of
//! recently published roots the verifier accepts.
//!
//! ## Modules
//!
//! - [`tree`] — Sparse Merkle tree with precomputed empty-subtree hashes
//! - [`proof`] — Inclusion proofs and root replay
//! - [`history`] — Bounded window of accepted roots
//! - [`snapshot`] — Commitment list files

pub mod history;
pub mod proof;
pub mod snapshot;
pub mod tree;

pub use history::RootHistory;
pub use proof::{MerkleInclusionProof, PathNode, Side};
pub use snapshot::MembershipSnapshot;
pub use tree::{build_proof, zero_hashes, MembershipTree};

/// Error types for registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The commitment is not a leaf of the tree.
    #[error("commitment not found in registry")]
    CommitmentNotFound,

    /// The tree already holds 2^depth leaves.
    #[error("registry capacity exceeded (capacity {capacity})")]
    CapacityExceeded { capacity: u64 },

    /// Depth outside 1..=32.
    #[error("invalid tree depth {0}")]
    InvalidDepth(usize),

    /// The commitment is already registered.
    #[error("commitment already registered at index {0}")]
    DuplicateCommitment(usize),

    /// Snapshot file could not be parsed.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// Snapshot file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
