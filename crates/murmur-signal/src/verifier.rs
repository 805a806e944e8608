//! Signal verification.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. the root is in the accepted window
//! 2. the nullifier hash is not yet spent in this round
//! 3. the Groth16 proof verifies against
//!    `(root, nullifier_hash, signal_hash, external_nullifier)`
//! 4. the nullifier hash is atomically marked spent
//!
//! The pairing check in step 3 runs without holding any lock. Step 4 decides
//! races between concurrent submissions of the same nullifier hash.

use std::fmt;

use murmur_crypto::groth16::{self, SignalPreparedKey, SignalVerifyingKey};
use murmur_crypto::poseidon;
use murmur_nullifier::NullifierStore;
use murmur_registry::RootHistory;

use crate::circuit::SignalCircuit;
use crate::prover::{PublicOutputs, SignalProof};
use crate::{encode_signal, signal_hash, ExternalNullifier, Result};

/// Tracing target for rejection reasons.
pub const AUDIT_TARGET: &str = "murmur::audit";

/// Why a signal was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    UnknownRoot,
    NullifierAlreadySpent,
    InvalidProof,
}

impl RejectReason {
    /// The reason as disclosed to submitters.
    ///
    /// Spent nullifiers and invalid proofs are indistinguishable outside the
    /// verifier.
    pub fn public_code(&self) -> &'static str {
        match self {
            RejectReason::UnknownRoot => "UNKNOWN_ROOT",
            RejectReason::NullifierAlreadySpent | RejectReason::InvalidProof => "PROOF_REJECTED",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::UnknownRoot => "unknown root",
            RejectReason::NullifierAlreadySpent => "nullifier already spent",
            RejectReason::InvalidProof => "invalid proof",
        };
        f.write_str(s)
    }
}

/// Outcome of a verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(RejectReason),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

/// Verifies signal proofs against one verification key.
pub struct SignalVerifier {
    prepared_key: SignalPreparedKey,
}

impl SignalVerifier {
    pub fn new(verifying_key: &SignalVerifyingKey) -> Self {
        Self {
            prepared_key: groth16::prepare(verifying_key),
        }
    }

    /// Run all checks and, on success, mark the nullifier hash spent.
    ///
    /// Only store failures are errors; every protocol failure is a
    /// [`Verdict::Reject`].
    pub fn verify(
        &self,
        proof: &SignalProof,
        outputs: &PublicOutputs,
        external_nullifier: &ExternalNullifier,
        signal: &str,
        accepted_roots: &RootHistory,
        spent: &dyn NullifierStore,
    ) -> Result<Verdict> {
        let scope = external_nullifier.to_bytes();
        let nullifier = outputs.nullifier_hash_bytes();

        if !accepted_roots.contains(&outputs.root) {
            return Ok(reject(RejectReason::UnknownRoot, outputs));
        }
        if spent.contains(&scope, &nullifier)? {
            return Ok(reject(RejectReason::NullifierAlreadySpent, outputs));
        }
        if !self.check_proof(proof, outputs, external_nullifier, signal) {
            return Ok(reject(RejectReason::InvalidProof, outputs));
        }
        if !spent.insert_if_absent(&scope, &nullifier)? {
            return Ok(reject(RejectReason::NullifierAlreadySpent, outputs));
        }

        tracing::debug!(
            nullifier_hash = %poseidon::to_hex(&outputs.nullifier_hash),
            round = %external_nullifier,
            "signal proof accepted"
        );
        Ok(Verdict::Accept)
    }

    /// Groth16 check alone, with no window or spent-set access.
    ///
    /// Undecodable proofs and over-long signals fail the check.
    pub fn check_proof(
        &self,
        proof: &SignalProof,
        outputs: &PublicOutputs,
        external_nullifier: &ExternalNullifier,
        signal: &str,
    ) -> bool {
        let Ok(encoded) = encode_signal(signal) else {
            return false;
        };
        let Ok(proof) = proof.to_proof() else {
            return false;
        };
        let inputs = SignalCircuit::public_inputs(
            outputs.root,
            outputs.nullifier_hash,
            signal_hash(&encoded),
            external_nullifier.as_field(),
        );
        groth16::verify(&self.prepared_key, &inputs, &proof).unwrap_or(false)
    }
}

fn reject(reason: RejectReason, outputs: &PublicOutputs) -> Verdict {
    tracing::warn!(
        target: AUDIT_TARGET,
        reason = %reason,
        nullifier_hash = %poseidon::to_hex(&outputs.nullifier_hash),
        root = %poseidon::to_hex(&outputs.root),
        "signal rejected"
    );
    Verdict::Reject(reason)
}
