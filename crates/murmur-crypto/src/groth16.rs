//! Groth16/BLS12-381 setup, proving and verification.
//!
//! The signal circuit is the only circuit in Murmur; this module is the thin
//! layer between it and `ark-groth16`, plus the on-disk format of the key
//! artifacts produced by the trusted setup.
//!
//! ## Sizes
//!
//! - Proof size: 192 bytes upper bound (compressed encoding is smaller)
//! - Verification: four public inputs, a handful of pairings

use std::path::Path;

use ark_bls12_381::{Bls12_381, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, ProvingKey, VerifyingKey};
use ark_relations::r1cs::ConstraintSynthesizer;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{CryptoError, Result};

/// Proof size in bytes for Groth16/BLS12-381.
pub const PROOF_SIZE: usize = 192;

pub type SignalProvingKey = ProvingKey<Bls12_381>;
pub type SignalVerifyingKey = VerifyingKey<Bls12_381>;
pub type SignalPreparedKey = PreparedVerifyingKey<Bls12_381>;
pub type Groth16Proof = Proof<Bls12_381>;

/// A serialized Groth16 proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedProof {
    pub bytes: Vec<u8>,
}

/// A serialized verification key.
#[derive(Clone, Debug)]
pub struct SerializedVerifyingKey {
    pub bytes: Vec<u8>,
}

/// A serialized proving key.
#[derive(Clone, Debug)]
pub struct SerializedProvingKey {
    pub bytes: Vec<u8>,
}

/// Run the circuit-specific setup.
///
/// Used by the trusted setup ceremony (`murmur-keygen`) and by tests. In
/// production the keys are generated once and distributed as files.
pub fn setup<C, R>(circuit: C, rng: &mut R) -> Result<(SignalProvingKey, SignalVerifyingKey)>
where
    C: ConstraintSynthesizer<Fr>,
    R: RngCore + CryptoRng,
{
    Groth16::<Bls12_381>::circuit_specific_setup(circuit, rng)
        .map_err(|e| CryptoError::Proof(e.to_string()))
}

/// Generate a Groth16 proof.
pub fn prove<C: ConstraintSynthesizer<Fr>>(
    circuit: C,
    proving_key: &SignalProvingKey,
) -> Result<Groth16Proof> {
    let mut rng = rand::rngs::OsRng;
    Groth16::<Bls12_381>::prove(proving_key, circuit, &mut rng)
        .map_err(|e| CryptoError::Proof(e.to_string()))
}

/// Prepare a verification key for repeated verification.
pub fn prepare(verifying_key: &SignalVerifyingKey) -> SignalPreparedKey {
    PreparedVerifyingKey::from(verifying_key.clone())
}

/// Verify a Groth16 proof against its public inputs.
pub fn verify(
    prepared_key: &SignalPreparedKey,
    public_inputs: &[Fr],
    proof: &Groth16Proof,
) -> Result<bool> {
    Groth16::<Bls12_381>::verify_with_processed_vk(prepared_key, public_inputs, proof)
        .map_err(|e| CryptoError::Proof(e.to_string()))
}

/// Encode any arkworks value in its compressed canonical form.
pub fn encode<T: CanonicalSerialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(value.compressed_size());
    value
        .serialize_compressed(&mut bytes)
        .map_err(|e| CryptoError::Serialization(e.to_string()))?;
    Ok(bytes)
}

/// Decode a compressed canonical encoding, validating curve points.
pub fn decode<T: CanonicalDeserialize>(bytes: &[u8]) -> Result<T> {
    T::deserialize_compressed(bytes).map_err(|e| CryptoError::Serialization(e.to_string()))
}

impl SerializedProof {
    pub fn from_proof(proof: &Groth16Proof) -> Result<Self> {
        Ok(Self {
            bytes: encode(proof)?,
        })
    }

    pub fn to_proof(&self) -> Result<Groth16Proof> {
        decode(&self.bytes)
    }
}

impl SerializedVerifyingKey {
    pub fn from_key(key: &SignalVerifyingKey) -> Result<Self> {
        Ok(Self {
            bytes: encode(key)?,
        })
    }

    pub fn to_key(&self) -> Result<SignalVerifyingKey> {
        decode(&self.bytes)
    }

    /// Read a verification key file.
    pub fn load(path: &Path) -> Result<Self> {
        read_artifact(path).map(|bytes| Self { bytes })
    }

    /// Write this key to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_artifact(path, &self.bytes)
    }
}

impl SerializedProvingKey {
    pub fn from_key(key: &SignalProvingKey) -> Result<Self> {
        Ok(Self {
            bytes: encode(key)?,
        })
    }

    pub fn to_key(&self) -> Result<SignalProvingKey> {
        decode(&self.bytes)
    }

    /// Read a proving key file.
    pub fn load(path: &Path) -> Result<Self> {
        read_artifact(path).map(|bytes| Self { bytes })
    }

    /// Write this key to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_artifact(path, &self.bytes)
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| CryptoError::Io(format!("{}: {e}", path.display())))
}

fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).map_err(|e| CryptoError::Io(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    /// Proves knowledge of `a` and `b` such that `a * b = c` where `c` is public.
    #[derive(Clone)]
    struct MultiplyCircuit {
        a: Fr,
        b: Fr,
    }

    impl ConstraintSynthesizer<Fr> for MultiplyCircuit {
        fn generate_constraints(
            self,
            cs: ConstraintSystemRef<Fr>,
        ) -> std::result::Result<(), SynthesisError> {
            let a_var = cs.new_witness_variable(|| Ok(self.a))?;
            let b_var = cs.new_witness_variable(|| Ok(self.b))?;
            let c_var = cs.new_input_variable(|| Ok(self.a * self.b))?;
            cs.enforce_constraint(
                ark_relations::lc!() + a_var,
                ark_relations::lc!() + b_var,
                ark_relations::lc!() + c_var,
            )?;
            Ok(())
        }
    }

    fn keys() -> (SignalProvingKey, SignalVerifyingKey) {
        let mut rng = StdRng::seed_from_u64(7);
        let circuit = MultiplyCircuit {
            a: Fr::from(3u64),
            b: Fr::from(7u64),
        };
        setup(circuit, &mut rng).expect("setup")
    }

    #[test]
    fn test_prove_verify() {
        let (pk, vk) = keys();
        let proof = prove(
            MultiplyCircuit {
                a: Fr::from(3u64),
                b: Fr::from(7u64),
            },
            &pk,
        )
        .expect("prove");
        let pvk = prepare(&vk);
        assert!(verify(&pvk, &[Fr::from(21u64)], &proof).expect("verify"));
        assert!(!verify(&pvk, &[Fr::from(22u64)], &proof).expect("verify"));
    }

    #[test]
    fn test_proof_serialization() {
        let (pk, _vk) = keys();
        let proof = prove(
            MultiplyCircuit {
                a: Fr::from(5u64),
                b: Fr::from(11u64),
            },
            &pk,
        )
        .expect("prove");
        let serialized = SerializedProof::from_proof(&proof).expect("encode");
        assert!(serialized.bytes.len() <= PROOF_SIZE);
        assert_eq!(serialized.to_proof().expect("decode"), proof);
    }

    #[test]
    fn test_garbage_proof_rejected() {
        let garbage = SerializedProof {
            bytes: vec![0xAB; 17],
        };
        assert!(garbage.to_proof().is_err());
    }

    #[test]
    fn test_verifying_key_file_roundtrip() {
        let (_pk, vk) = keys();
        let path = std::env::temp_dir().join(format!("murmur_vk_{}.bin", rand::random::<u64>()));
        let serialized = SerializedVerifyingKey::from_key(&vk).expect("encode");
        serialized.save(&path).expect("save");
        let loaded = SerializedVerifyingKey::load(&path).expect("load");
        assert_eq!(loaded.to_key().expect("decode"), vk);
        let _ = std::fs::remove_file(&path);
    }
}
