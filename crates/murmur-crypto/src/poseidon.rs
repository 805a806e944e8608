//! Poseidon hash on the BLS12-381 scalar field.
//!
//! Every value that the signal circuit recomputes (identity commitment,
//! Merkle nodes, nullifier hash) is a 2-to-1 Poseidon hash. The native
//! function and the R1CS gadget share one parameter set, so a value hashed
//! here is reproduced bit-for-bit inside the proof.
//!
//! ## Parameters
//!
//! - Field: BLS12-381 scalar field
//! - Width (t): 3 (rate 2, capacity 1)
//! - Full rounds (R_F): 8
//! - Partial rounds (R_P): 57
//! - S-box: x^5
//! - Round constants and MDS matrix: Grain LFSR

use std::sync::OnceLock;

use ark_bls12_381::Fr;
use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_crypto_primitives::sponge::poseidon::{
    find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge,
};
use ark_crypto_primitives::sponge::CryptographicSponge;
use ark_ff::{BigInteger, BigInteger256, PrimeField};
use ark_r1cs_std::fields::fp::FpVar;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::{CryptoError, Result};

/// Number of full rounds.
pub const FULL_ROUNDS: usize = 8;

/// Number of partial rounds.
pub const PARTIAL_ROUNDS: usize = 57;

/// S-box exponent.
pub const ALPHA: u64 = 5;

/// Sponge rate (field elements absorbed per permutation).
pub const RATE: usize = 2;

/// Sponge capacity.
pub const CAPACITY: usize = 1;

/// Width of the permutation.
pub const WIDTH: usize = RATE + CAPACITY;

/// Canonical byte length of a scalar.
pub const FIELD_BYTES: usize = 32;

/// Build the Poseidon configuration for any prime field.
pub fn params_for<F: PrimeField>() -> PoseidonConfig<F> {
    let (ark, mds) = find_poseidon_ark_and_mds::<F>(
        F::MODULUS_BIT_SIZE as u64,
        RATE,
        FULL_ROUNDS as u64,
        PARTIAL_ROUNDS as u64,
        0,
    );
    PoseidonConfig::new(FULL_ROUNDS, PARTIAL_ROUNDS, ALPHA, mds, ark, RATE, CAPACITY)
}

/// The Murmur Poseidon parameters on the BLS12-381 scalar field.
///
/// Generated once per process; the Grain LFSR is not cheap.
pub fn default_params() -> &'static PoseidonConfig<Fr> {
    static PARAMS: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();
    PARAMS.get_or_init(params_for::<Fr>)
}

/// Compute the Poseidon hash of two field elements.
pub fn hash(a: Fr, b: Fr) -> Fr {
    let mut sponge = PoseidonSponge::<Fr>::new(default_params());
    sponge.absorb(&vec![a, b]);
    sponge.squeeze_field_elements::<Fr>(1)[0]
}

/// In-circuit counterpart of [`hash`].
pub fn hash_var(
    cs: ConstraintSystemRef<Fr>,
    params: &PoseidonConfig<Fr>,
    a: &FpVar<Fr>,
    b: &FpVar<Fr>,
) -> std::result::Result<FpVar<Fr>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::<Fr>::new(cs, params);
    sponge.absorb(&vec![a.clone(), b.clone()])?;
    let mut output = sponge.squeeze_field_elements(1)?;
    Ok(output.remove(0))
}

/// Convert 32 big-endian bytes to a scalar.
///
/// Values at or above the field modulus are rejected rather than reduced.
pub fn bytes_to_field(bytes: &[u8; 32]) -> Result<Fr> {
    let mut repr = [0u64; 4];
    for (i, chunk) in bytes.rchunks(8).take(4).enumerate() {
        let mut b = [0u8; 8];
        b.copy_from_slice(chunk);
        repr[i] = u64::from_be_bytes(b);
    }
    let big = BigInteger256::new(repr);
    Fr::from_bigint(big)
        .ok_or_else(|| CryptoError::InvalidInput("value exceeds field modulus".into()))
}

/// Convert a scalar to its canonical 32-byte big-endian encoding.
pub fn field_to_bytes(f: &Fr) -> [u8; 32] {
    let be = f.into_bigint().to_bytes_be();
    let mut bytes = [0u8; 32];
    bytes[FIELD_BYTES - be.len()..].copy_from_slice(&be);
    bytes
}

/// Interpret a digest produced by [`crate::blake3::field_digest`] as a scalar.
pub fn field_from_digest(digest: &[u8; 32]) -> Fr {
    Fr::from_be_bytes_mod_order(digest)
}

/// Render a scalar as a decimal string.
pub fn to_decimal(f: &Fr) -> String {
    f.into_bigint().to_string()
}

/// Parse a decimal string into a scalar, rejecting values at or above the modulus.
pub fn from_decimal(s: &str) -> Result<Fr> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CryptoError::InvalidInput(format!("not a decimal scalar: {s:?}")));
    }
    let mut limbs = [0u64; 4];
    for digit in s.bytes().map(|b| u128::from(b - b'0')) {
        let mut carry = digit;
        for limb in limbs.iter_mut() {
            let v = u128::from(*limb) * 10 + carry;
            *limb = v as u64;
            carry = v >> 64;
        }
        if carry != 0 {
            return Err(CryptoError::InvalidInput("value exceeds 256 bits".into()));
        }
    }
    Fr::from_bigint(BigInteger256::new(limbs))
        .ok_or_else(|| CryptoError::InvalidInput("value exceeds field modulus".into()))
}

/// Render a scalar as lowercase hex of its 32-byte big-endian encoding.
pub fn to_hex(f: &Fr) -> String {
    hex::encode(field_to_bytes(f))
}

/// Parse hex (optionally `0x`-prefixed, up to 32 bytes) into a scalar.
pub fn from_hex(s: &str) -> Result<Fr> {
    let s = s.trim();
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let padded = format!("{digits:0>64}");
    let raw = hex::decode(&padded)
        .map_err(|e| CryptoError::InvalidInput(format!("bad hex scalar: {e}")))?;
    let bytes: [u8; 32] = raw
        .try_into()
        .map_err(|_| CryptoError::InvalidInput("hex scalar longer than 32 bytes".into()))?;
    bytes_to_field(&bytes)
}

/// Parse a scalar written either as decimal or as `0x`-prefixed hex.
pub fn parse_field(s: &str) -> Result<Fr> {
    if s.trim().starts_with("0x") {
        from_hex(s)
    } else {
        from_decimal(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_r1cs_std::alloc::AllocVar;
    use ark_r1cs_std::R1CSVar;
    use ark_relations::r1cs::ConstraintSystem;

    #[test]
    fn test_poseidon_deterministic() {
        let h1 = hash(Fr::from(1u64), Fr::from(2u64));
        let h2 = hash(Fr::from(1u64), Fr::from(2u64));
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_poseidon_different_inputs() {
        let h1 = hash(Fr::from(1u64), Fr::from(2u64));
        let h2 = hash(Fr::from(3u64), Fr::from(4u64));
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_poseidon_noncommutative() {
        let h1 = hash(Fr::from(1u64), Fr::from(2u64));
        let h2 = hash(Fr::from(2u64), Fr::from(1u64));
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_poseidon_zero_inputs() {
        assert_ne!(hash(Fr::from(0u64), Fr::from(0u64)), Fr::from(0u64));
    }

    #[test]
    fn test_gadget_matches_native() {
        let a = Fr::from(7u64);
        let b = Fr::from(11u64);
        let cs = ConstraintSystem::<Fr>::new_ref();
        let a_var = FpVar::new_witness(cs.clone(), || Ok(a)).expect("alloc a");
        let b_var = FpVar::new_witness(cs.clone(), || Ok(b)).expect("alloc b");
        let out = hash_var(cs.clone(), default_params(), &a_var, &b_var).expect("hash var");
        assert_eq!(out.value().expect("value"), hash(a, b));
        assert!(cs.is_satisfied().expect("satisfied"));
    }

    #[test]
    fn test_params_shape() {
        let params = default_params();
        assert_eq!(params.full_rounds, FULL_ROUNDS);
        assert_eq!(params.partial_rounds, PARTIAL_ROUNDS);
        assert_eq!(params.rate, RATE);
        assert_eq!(params.capacity, CAPACITY);
        assert_eq!(params.mds.len(), WIDTH);
        assert_eq!(params.ark.len(), FULL_ROUNDS + PARTIAL_ROUNDS);
    }

    #[test]
    fn test_field_bytes_roundtrip() {
        let f = Fr::from(0x0102_0304_0506_0708u64);
        let bytes = field_to_bytes(&f);
        assert_eq!(&bytes[24..], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(bytes_to_field(&bytes).expect("valid"), f);
    }

    #[test]
    fn test_bytes_above_modulus_rejected() {
        assert!(bytes_to_field(&[0xFF; 32]).is_err());
    }

    #[test]
    fn test_decimal_parsing() {
        assert_eq!(from_decimal("0").expect("zero"), Fr::from(0u64));
        assert_eq!(from_decimal("123456789").expect("parse"), Fr::from(123_456_789u64));
        assert_eq!(to_decimal(&Fr::from(42u64)), "42");
        assert!(from_decimal("").is_err());
        assert!(from_decimal("12a").is_err());
        // 2^256 does not fit.
        assert!(from_decimal(
            "115792089237316195423570985008687907853269984665640564039457584007913129639936"
        )
        .is_err());
    }

    #[test]
    fn test_hex_parsing() {
        let f = Fr::from(255u64);
        assert_eq!(from_hex("0xff").expect("short hex"), f);
        assert_eq!(from_hex(&to_hex(&f)).expect("full hex"), f);
        assert_eq!(parse_field("0x0a").expect("hex"), Fr::from(10u64));
        assert_eq!(parse_field("10").expect("dec"), Fr::from(10u64));
    }
}
