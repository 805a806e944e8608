//! R1CS constraints of the signal statement.
//!
//! Public inputs, in allocation order:
//!
//! 1. `root` — registry root the membership path leads to
//! 2. `nullifier_hash` — `Poseidon(nullifier_secret, external_nullifier)`
//! 3. `signal_hash` — hash of the encoded signal
//! 4. `external_nullifier` — round or topic scalar
//!
//! Witness: trapdoor, nullifier secret, one sibling and one direction bit
//! per tree level.

use ark_r1cs_std::alloc::AllocVar;
use ark_r1cs_std::boolean::Boolean;
use ark_r1cs_std::eq::EqGadget;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::fields::FieldVar;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use murmur_crypto::{poseidon, Fr};
use murmur_registry::MerkleInclusionProof;

/// Private inputs of one proof.
pub struct SignalWitness<'a> {
    pub trapdoor: Fr,
    pub nullifier_secret: Fr,
    pub inclusion: &'a MerkleInclusionProof,
}

/// The signal circuit for a fixed tree depth.
#[derive(Clone, Debug)]
pub struct SignalCircuit {
    pub depth: usize,
    pub root: Option<Fr>,
    pub nullifier_hash: Option<Fr>,
    pub signal_hash: Option<Fr>,
    pub external_nullifier: Option<Fr>,
    pub trapdoor: Option<Fr>,
    pub nullifier_secret: Option<Fr>,
    /// `(sibling, is_right)` per level, leaf first. `is_right` is set when
    /// the running node is the right child.
    pub path: Vec<(Option<Fr>, Option<bool>)>,
}

impl SignalCircuit {
    /// A circuit with no assignments, for key generation.
    pub fn blank(depth: usize) -> Self {
        Self {
            depth,
            root: None,
            nullifier_hash: None,
            signal_hash: None,
            external_nullifier: None,
            trapdoor: None,
            nullifier_secret: None,
            path: vec![(None, None); depth],
        }
    }

    /// A fully assigned circuit.
    pub fn assigned(
        witness: &SignalWitness<'_>,
        nullifier_hash: Fr,
        signal_hash: Fr,
        external_nullifier: Fr,
    ) -> Self {
        let path = witness
            .inclusion
            .sibling_hashes()
            .into_iter()
            .zip(witness.inclusion.path_bits())
            .map(|(sibling, is_right)| (Some(sibling), Some(is_right)))
            .collect();
        Self {
            depth: witness.inclusion.depth(),
            root: Some(witness.inclusion.root),
            nullifier_hash: Some(nullifier_hash),
            signal_hash: Some(signal_hash),
            external_nullifier: Some(external_nullifier),
            trapdoor: Some(witness.trapdoor),
            nullifier_secret: Some(witness.nullifier_secret),
            path,
        }
    }

    /// Public inputs in the order the circuit allocates them.
    pub fn public_inputs(
        root: Fr,
        nullifier_hash: Fr,
        signal_hash: Fr,
        external_nullifier: Fr,
    ) -> [Fr; 4] {
        [root, nullifier_hash, signal_hash, external_nullifier]
    }
}

fn input(cs: &ConstraintSystemRef<Fr>, value: Option<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
    FpVar::new_input(cs.clone(), || value.ok_or(SynthesisError::AssignmentMissing))
}

fn witness(cs: &ConstraintSystemRef<Fr>, value: Option<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
    FpVar::new_witness(cs.clone(), || value.ok_or(SynthesisError::AssignmentMissing))
}

impl ConstraintSynthesizer<Fr> for SignalCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        if self.depth == 0 || self.path.len() != self.depth {
            return Err(SynthesisError::Unsatisfiable);
        }
        let params = poseidon::default_params();

        let root = input(&cs, self.root)?;
        let nullifier_hash = input(&cs, self.nullifier_hash)?;
        let signal_hash = input(&cs, self.signal_hash)?;
        let external_nullifier = input(&cs, self.external_nullifier)?;

        let trapdoor = witness(&cs, self.trapdoor)?;
        let nullifier_secret = witness(&cs, self.nullifier_secret)?;

        let commitment = poseidon::hash_var(cs.clone(), params, &trapdoor, &nullifier_secret)?;

        let mut current = commitment;
        for (sibling_value, is_right_value) in self.path {
            let sibling = witness(&cs, sibling_value)?;
            let is_right = Boolean::new_witness(cs.clone(), || {
                is_right_value.ok_or(SynthesisError::AssignmentMissing)
            })?;
            let left = is_right.select(&sibling, &current)?;
            let right = is_right.select(&current, &sibling)?;
            current = poseidon::hash_var(cs.clone(), params, &left, &right)?;
        }
        current.enforce_equal(&root)?;

        let computed_nullifier_hash =
            poseidon::hash_var(cs.clone(), params, &nullifier_secret, &external_nullifier)?;
        computed_nullifier_hash.enforce_equal(&nullifier_hash)?;

        // Ties the signal hash into the constraint system.
        let _signal_square = signal_hash.square()?;

        Ok(())
    }
}
