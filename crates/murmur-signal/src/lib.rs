//! # murmur-signal
//!
//! The anonymous-signal proof: a member proves, in zero knowledge, that
//! their identity commitment is a leaf of the registry tree with a given
//! root, that the published nullifier hash is theirs for this round, and
//! that the proof is bound to one exact signal.
//!
//! ## Modules
//!
//! - [`circuit`] — R1CS constraints of the signal statement
//! - [`keys`] — Trusted setup output and key files
//! - [`prover`] — Proof generation, inline or on a blocking worker
//! - [`verifier`] — Root window, spent set and Groth16 checks

pub mod circuit;
pub mod keys;
pub mod prover;
pub mod verifier;

pub use circuit::SignalCircuit;
pub use keys::SignalKeys;
pub use prover::{ProofTask, PublicOutputs, SignalProof, SignalProver};
pub use verifier::{RejectReason, SignalVerifier, Verdict};

use std::fmt;

use murmur_crypto::blake3::{self, contexts};
use murmur_crypto::{poseidon, Fr};
use murmur_types::signal::{self, EncodedSignal, SignalEncodingError};
use murmur_types::Hash;

/// Error types for signal proving and verification.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// The signal does not fit in its 32-byte field.
    #[error("signal too long: {len} bytes (max {max})")]
    SignalTooLong { len: usize, max: usize },

    /// The proving primitive failed or the witness is inconsistent.
    #[error("proof generation failed: {0}")]
    ProofGenerationFailed(String),

    /// A background proof task was cancelled before completing.
    #[error("proof task cancelled")]
    Cancelled,

    /// Key material could not be generated, read or written.
    #[error("key error: {0}")]
    Keys(String),

    /// The spent-nullifier store failed.
    #[error(transparent)]
    Store(#[from] murmur_nullifier::NullifierError),

    /// Malformed scalar encoding.
    #[error("invalid encoding: {0}")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, SignalError>;

/// The public round or topic a signal is scoped to.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternalNullifier(Fr);

impl ExternalNullifier {
    /// A numbered round.
    pub fn from_round(round: u64) -> Self {
        Self(Fr::from(round))
    }

    /// A named topic, hashed into the field.
    pub fn from_topic(topic: &str) -> Self {
        let digest = blake3::field_digest(contexts::EXTERNAL_NULLIFIER, topic.as_bytes());
        Self(poseidon::field_from_digest(&digest))
    }

    pub fn from_bytes(bytes: &Hash) -> Result<Self> {
        poseidon::bytes_to_field(bytes)
            .map(Self)
            .map_err(|e| SignalError::Encoding(e.to_string()))
    }

    pub fn as_field(&self) -> Fr {
        self.0
    }

    /// Spent-set scope and wire encoding.
    pub fn to_bytes(&self) -> Hash {
        poseidon::field_to_bytes(&self.0)
    }
}

impl fmt::Debug for ExternalNullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExternalNullifier({})", poseidon::to_hex(&self.0))
    }
}

impl fmt::Display for ExternalNullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&poseidon::to_hex(&self.0))
    }
}

/// Hash an encoded signal into the field.
pub fn signal_hash(encoded: &EncodedSignal) -> Fr {
    poseidon::field_from_digest(&blake3::field_digest(contexts::SIGNAL_HASH, encoded))
}

/// Encode a signal, mapping an over-long payload to [`SignalError::SignalTooLong`]
/// and an embedded NUL to [`SignalError::Encoding`].
pub fn encode_signal(text: &str) -> Result<EncodedSignal> {
    signal::encode(text.as_bytes()).map_err(|e| match e {
        SignalEncodingError::TooLong { len, max } => SignalError::SignalTooLong { len, max },
        other => SignalError::Encoding(other.to_string()),
    })
}

/// Encode and hash a signal.
pub fn hash_signal(text: &str) -> Result<Fr> {
    encode_signal(text).map(|encoded| signal_hash(&encoded))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_and_topic_differ() {
        assert_ne!(
            ExternalNullifier::from_round(1),
            ExternalNullifier::from_topic("1")
        );
        assert_eq!(
            ExternalNullifier::from_topic("greetings"),
            ExternalNullifier::from_topic("greetings")
        );
    }

    #[test]
    fn test_external_nullifier_bytes_roundtrip() {
        let en = ExternalNullifier::from_topic("greetings");
        assert_eq!(ExternalNullifier::from_bytes(&en.to_bytes()).expect("decode"), en);
        assert!(ExternalNullifier::from_bytes(&[0xFF; 32]).is_err());
    }

    #[test]
    fn test_signal_hash_binds_payload() {
        assert_ne!(
            hash_signal("Hello World").expect("hash"),
            hash_signal("Hello World!").expect("hash")
        );
    }

    #[test]
    fn test_signal_too_long() {
        assert!(hash_signal(&"a".repeat(31)).is_ok());
        assert!(matches!(
            hash_signal(&"a".repeat(32)),
            Err(SignalError::SignalTooLong { len: 32, max: 31 })
        ));
    }

    #[test]
    fn test_signal_with_nul_unencodable() {
        assert!(matches!(hash_signal("gm\0"), Err(SignalError::Encoding(_))));
        assert!(matches!(encode_signal("g\0m"), Err(SignalError::Encoding(_))));
    }
}
