//! Acceptance notifications pushed to subscribers.

use serde::{Deserialize, Serialize};
use serde_with::hex::Hex;
use serde_with::serde_as;

use crate::wire::SignalRecord;
use crate::Hash;

/// Emitted once per accepted nullifier hash.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalAccepted {
    /// Same value as the signal log sequence.
    pub sequence: u64,
    #[serde_as(as = "Hex")]
    pub round: Hash,
    pub signal: String,
    #[serde_as(as = "Hex")]
    pub nullifier_hash: Hash,
    #[serde_as(as = "Hex")]
    pub root: Hash,
}

impl From<&SignalRecord> for SignalAccepted {
    fn from(record: &SignalRecord) -> Self {
        Self {
            sequence: record.sequence,
            round: record.round,
            signal: record.signal.clone(),
            nullifier_hash: record.nullifier_hash,
            root: record.root,
        }
    }
}
