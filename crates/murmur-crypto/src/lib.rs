//! # murmur-crypto
//!
//! Cryptographic primitives for the Murmur anonymous-signal protocol.
//!
//! The suite is fixed: BLS12-381 scalar field, Poseidon for everything that
//! is hashed inside the proving circuit, BLAKE3 for everything outside it,
//! Groth16 for proofs.
//!
//! ## Modules
//!
//! - [`blake3`] — Domain-separated BLAKE3 hashing
//! - [`poseidon`] — Poseidon hash on the BLS12-381 scalar field (native and in-circuit)
//! - [`groth16`] — Groth16/BLS12-381 setup, proving and verification

pub mod blake3;
pub mod groth16;
pub mod poseidon;

pub use ark_bls12_381::Fr;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Groth16 setup, proof generation or verification failed.
    #[error("proof error: {0}")]
    Proof(String),

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Key artifact could not be read or written.
    #[error("key file error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
