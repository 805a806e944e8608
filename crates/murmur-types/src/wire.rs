//! Relay ingress and ledger receipt structures.
//!
//! Scalars travel as lowercase hex of their 32-byte big-endian encoding;
//! proofs as hex of their compressed encoding.

use serde::{Deserialize, Serialize};
use serde_with::hex::Hex;
use serde_with::serde_as;

use crate::Hash;

/// A signal submission as received by the relay.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Signal text, at most 31 bytes once encoded.
    pub signal: String,
    #[serde_as(as = "Hex")]
    pub nullifier_hash: Hash,
    #[serde_as(as = "Hex")]
    pub proof: Vec<u8>,
    /// Root the proof was generated against. Omitted means the current root.
    #[serde_as(as = "Option<Hex>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<Hash>,
}

/// Proof of acceptance returned to the submitter.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Position in the accepted signal log.
    pub sequence: u64,
    /// External nullifier of the round the signal was accepted in.
    #[serde_as(as = "Hex")]
    pub round: Hash,
    #[serde_as(as = "Hex")]
    pub nullifier_hash: Hash,
    #[serde_as(as = "Hex")]
    pub root: Hash,
    /// Unix seconds.
    pub accepted_at: u64,
}

/// An entry of the accepted signal log.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub sequence: u64,
    #[serde_as(as = "Hex")]
    pub round: Hash,
    pub signal: String,
    #[serde_as(as = "Hex")]
    pub nullifier_hash: Hash,
    #[serde_as(as = "Hex")]
    pub root: Hash,
    pub accepted_at: u64,
}

impl SignalRecord {
    pub fn receipt(&self) -> Receipt {
        Receipt {
            sequence: self.sequence,
            round: self.round,
            nullifier_hash: self.nullifier_hash,
            root: self.root,
            accepted_at: self.accepted_at,
        }
    }
}
