//! # murmur-ledger
//!
//! The relay's ledger host: owns the membership registry and its root
//! window, the current round, the spent-nullifier set and the accepted
//! signal log, and runs every submission through the signal verifier.
//!
//! The ledger never learns which member produced a signal; it sees only
//! roots, nullifier hashes and proofs.
//!
//! ## Modules
//!
//! - [`ledger`] — Registration, submission and round management
//! - [`events`] — Acceptance event broadcasting
//! - [`storage`] — Durable record of ledger activity

pub mod events;
pub mod ledger;
pub mod storage;

pub use events::{EventBus, Subscription};
pub use ledger::Ledger;
pub use storage::{EphemeralStorage, LedgerStorage, SqliteStorage};

use murmur_registry::RegistryError;
use murmur_signal::RejectReason;

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The submission was refused. Carries the public rejection code only.
    #[error("{0}")]
    Rejected(&'static str),

    /// The proof was built against a root outside the accepted window.
    #[error("UNKNOWN_ROOT")]
    UnknownRoot,

    /// The request could not be decoded.
    #[error("malformed request: {0}")]
    Malformed(String),

    /// Persisting ledger state failed.
    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl From<RejectReason> for LedgerError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::UnknownRoot => LedgerError::UnknownRoot,
            other => LedgerError::Rejected(other.public_code()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_reason_mapping() {
        assert!(matches!(
            LedgerError::from(RejectReason::UnknownRoot),
            LedgerError::UnknownRoot
        ));
        assert!(matches!(
            LedgerError::from(RejectReason::InvalidProof),
            LedgerError::Rejected("PROOF_REJECTED")
        ));
        assert!(matches!(
            LedgerError::from(RejectReason::NullifierAlreadySpent),
            LedgerError::Rejected("PROOF_REJECTED")
        ));
    }
}
