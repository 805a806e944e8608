//! Proof generation.
//!
//! The prover holds only an `Arc` to immutable key material, so any number
//! of proofs for different members can run in parallel.

use std::sync::Arc;

use murmur_crypto::groth16::{self, SignalProvingKey};
use murmur_crypto::{poseidon, Fr};
use murmur_identity::Identity;
use murmur_nullifier::derive_nullifier_hash;
use murmur_registry::MerkleInclusionProof;
use murmur_types::Hash;
use tokio::task::JoinHandle;

use crate::circuit::{SignalCircuit, SignalWitness};
use crate::keys::SignalKeys;
use crate::{encode_signal, signal_hash, ExternalNullifier, Result, SignalError};

/// A compressed Groth16 proof.
pub use murmur_crypto::groth16::SerializedProof as SignalProof;

/// Values published alongside a proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicOutputs {
    pub root: Fr,
    pub nullifier_hash: Fr,
}

impl PublicOutputs {
    pub fn root_bytes(&self) -> Hash {
        poseidon::field_to_bytes(&self.root)
    }

    pub fn nullifier_hash_bytes(&self) -> Hash {
        poseidon::field_to_bytes(&self.nullifier_hash)
    }
}

/// Generates signal proofs for one tree depth.
#[derive(Clone)]
pub struct SignalProver {
    depth: usize,
    proving_key: Arc<SignalProvingKey>,
}

impl SignalProver {
    pub fn new(depth: usize, proving_key: Arc<SignalProvingKey>) -> Self {
        Self { depth, proving_key }
    }

    pub fn from_keys(keys: &SignalKeys) -> Self {
        Self::new(keys.depth, Arc::clone(&keys.proving_key))
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Prove membership and bind `signal` for the round `external_nullifier`.
    ///
    /// # Errors
    ///
    /// - [`SignalError::SignalTooLong`] if the signal exceeds 31 bytes
    /// - [`SignalError::ProofGenerationFailed`] if the inclusion proof does not
    ///   match the identity, its own root or the key depth, or proving fails
    pub fn prove(
        &self,
        identity: &Identity,
        inclusion: &MerkleInclusionProof,
        external_nullifier: ExternalNullifier,
        signal: &str,
    ) -> Result<(SignalProof, PublicOutputs)> {
        let encoded = encode_signal(signal)?;

        if inclusion.depth() != self.depth {
            return Err(SignalError::ProofGenerationFailed(format!(
                "inclusion proof depth {} does not match key depth {}",
                inclusion.depth(),
                self.depth
            )));
        }
        if inclusion.leaf != identity.commitment() {
            return Err(SignalError::ProofGenerationFailed(
                "inclusion proof is for a different commitment".into(),
            ));
        }
        if inclusion.compute_root() != inclusion.root {
            return Err(SignalError::ProofGenerationFailed(
                "inclusion path does not reproduce its root".into(),
            ));
        }

        let external = external_nullifier.as_field();
        let nullifier_hash = derive_nullifier_hash(identity.nullifier_secret(), external);
        let witness = SignalWitness {
            trapdoor: identity.trapdoor(),
            nullifier_secret: identity.nullifier_secret(),
            inclusion,
        };
        let circuit =
            SignalCircuit::assigned(&witness, nullifier_hash, signal_hash(&encoded), external);

        let proof = groth16::prove(circuit, &self.proving_key)
            .and_then(|p| SignalProof::from_proof(&p))
            .map_err(|e| SignalError::ProofGenerationFailed(e.to_string()))?;

        let outputs = PublicOutputs {
            root: inclusion.root,
            nullifier_hash,
        };
        tracing::debug!(
            root = %poseidon::to_hex(&outputs.root),
            nullifier_hash = %poseidon::to_hex(&outputs.nullifier_hash),
            proof_bytes = proof.bytes.len(),
            "signal proof generated"
        );
        Ok((proof, outputs))
    }

    /// Run [`Self::prove`] on the blocking worker pool.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn prove_in_background(
        &self,
        identity: Identity,
        inclusion: MerkleInclusionProof,
        external_nullifier: ExternalNullifier,
        signal: String,
    ) -> ProofTask {
        let prover = self.clone();
        let handle = tokio::task::spawn_blocking(move || {
            prover.prove(&identity, &inclusion, external_nullifier, &signal)
        });
        ProofTask { handle }
    }
}

/// A proof being generated on a blocking worker.
///
/// Dropping or cancelling the task discards its result; proving has no
/// side effects.
pub struct ProofTask {
    handle: JoinHandle<Result<(SignalProof, PublicOutputs)>>,
}

impl ProofTask {
    /// Wait for the proof.
    pub async fn wait(self) -> Result<(SignalProof, PublicOutputs)> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(SignalError::Cancelled),
            Err(e) => Err(SignalError::ProofGenerationFailed(e.to_string())),
        }
    }

    /// Abandon the proof.
    pub fn cancel(self) {
        self.handle.abort();
        tracing::debug!("signal proof task cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use murmur_registry::MembershipTree;

    fn tree() -> MembershipTree {
        let commitments: Vec<Fr> = fixtures::members().iter().map(|m| m.commitment()).collect();
        MembershipTree::from_commitments(fixtures::DEPTH, &commitments).expect("tree")
    }

    #[test]
    fn test_prove_outputs() {
        let members = fixtures::members();
        let tree = tree();
        let prover = SignalProver::from_keys(fixtures::keys());
        let inclusion = tree.proof_for(&members[1].commitment()).expect("inclusion");
        assert_eq!(inclusion.depth(), 2);

        let round = ExternalNullifier::from_round(1);
        let (proof, outputs) = prover
            .prove(&members[1], &inclusion, round, "Hello World")
            .expect("prove");
        assert!(proof.bytes.len() <= groth16::PROOF_SIZE);
        assert_eq!(outputs.root, tree.root());
        assert_eq!(
            outputs.nullifier_hash,
            derive_nullifier_hash(members[1].nullifier_secret(), round.as_field())
        );
    }

    #[test]
    fn test_signal_too_long() {
        let members = fixtures::members();
        let inclusion = tree().proof_for(&members[0].commitment()).expect("inclusion");
        let prover = SignalProver::from_keys(fixtures::keys());
        let result = prover.prove(
            &members[0],
            &inclusion,
            ExternalNullifier::from_round(1),
            &"x".repeat(32),
        );
        assert!(matches!(result, Err(SignalError::SignalTooLong { len: 32, max: 31 })));
    }

    #[test]
    fn test_signal_with_nul_fails() {
        let members = fixtures::members();
        let inclusion = tree().proof_for(&members[0].commitment()).expect("inclusion");
        let prover = SignalProver::from_keys(fixtures::keys());
        let result = prover.prove(&members[0], &inclusion, ExternalNullifier::from_round(1), "gm\0");
        assert!(matches!(result, Err(SignalError::Encoding(_))));
    }

    #[test]
    fn test_wrong_identity_fails() {
        let members = fixtures::members();
        let inclusion = tree().proof_for(&members[0].commitment()).expect("inclusion");
        let prover = SignalProver::from_keys(fixtures::keys());
        let result = prover.prove(&members[2], &inclusion, ExternalNullifier::from_round(1), "hi");
        assert!(matches!(result, Err(SignalError::ProofGenerationFailed(_))));
    }

    #[test]
    fn test_depth_mismatch_fails() {
        let members = fixtures::members();
        let commitments: Vec<Fr> = members.iter().map(|m| m.commitment()).collect();
        let deep = MembershipTree::from_commitments(3, &commitments).expect("tree");
        let inclusion = deep.proof_for(&members[0].commitment()).expect("inclusion");
        let prover = SignalProver::from_keys(fixtures::keys());
        let result = prover.prove(&members[0], &inclusion, ExternalNullifier::from_round(1), "hi");
        assert!(matches!(result, Err(SignalError::ProofGenerationFailed(_))));
    }

    #[test]
    fn test_tampered_path_fails() {
        let members = fixtures::members();
        let mut inclusion = tree().proof_for(&members[0].commitment()).expect("inclusion");
        inclusion.siblings[0].sibling = Fr::from(12345u64);
        let prover = SignalProver::from_keys(fixtures::keys());
        let result = prover.prove(&members[0], &inclusion, ExternalNullifier::from_round(1), "hi");
        assert!(matches!(result, Err(SignalError::ProofGenerationFailed(_))));
    }

    #[tokio::test]
    async fn test_prove_in_background() {
        let members = fixtures::members();
        let tree = tree();
        let inclusion = tree.proof_for(&members[2].commitment()).expect("inclusion");
        let prover = SignalProver::from_keys(fixtures::keys());
        let task = prover.prove_in_background(
            members[2].clone(),
            inclusion,
            ExternalNullifier::from_topic("greetings"),
            "gm".into(),
        );
        let (_proof, outputs) = task.wait().await.expect("background proof");
        assert_eq!(outputs.root, tree.root());
    }

    #[tokio::test]
    async fn test_cancel_has_no_effect_on_other_tasks() {
        let members = fixtures::members();
        let tree = tree();
        let prover = SignalProver::from_keys(fixtures::keys());
        let round = ExternalNullifier::from_round(9);

        let abandoned = prover.prove_in_background(
            members[0].clone(),
            tree.proof_for(&members[0].commitment()).expect("inclusion"),
            round,
            "first".into(),
        );
        let kept = prover.prove_in_background(
            members[1].clone(),
            tree.proof_for(&members[1].commitment()).expect("inclusion"),
            round,
            "second".into(),
        );
        abandoned.cancel();
        assert!(kept.wait().await.is_ok());
    }
}
