//! # murmur-identity
//!
//! A member's secret identity: trapdoor and nullifier secret, derived
//! deterministically from a user secret, plus the public identity commitment
//! that is registered in the membership tree.
//!
//! Secret scalars are zeroized on drop, never serialized and never printed.

use std::fmt;
use std::sync::RwLock;

use murmur_crypto::blake3::{self, contexts};
use murmur_crypto::{poseidon, Fr};
use rand::RngCore;
use zeroize::Zeroize;

/// Error types for identity operations.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The user secret is empty.
    #[error("invalid secret: must not be empty")]
    InvalidSecret,

    /// No identity is unlocked in this session.
    #[error("identity store is locked")]
    Locked,
}

pub type Result<T> = std::result::Result<T, IdentityError>;

/// A member identity.
#[derive(Clone)]
pub struct Identity {
    trapdoor: Fr,
    nullifier_secret: Fr,
    commitment: Fr,
}

impl Identity {
    /// Build an identity from its two secret scalars.
    pub fn from_secrets(trapdoor: Fr, nullifier_secret: Fr) -> Self {
        let commitment = poseidon::hash(trapdoor, nullifier_secret);
        Self {
            trapdoor,
            nullifier_secret,
            commitment,
        }
    }

    /// Generate an identity from 32 fresh random bytes.
    pub fn generate() -> Self {
        let mut secret = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut secret);
        let trapdoor = reduce(contexts::IDENTITY_TRAPDOOR, &secret);
        let nullifier_secret = reduce(contexts::IDENTITY_NULLIFIER, &secret);
        secret.zeroize();
        Self::from_secrets(trapdoor, nullifier_secret)
    }

    pub fn trapdoor(&self) -> Fr {
        self.trapdoor
    }

    pub fn nullifier_secret(&self) -> Fr {
        self.nullifier_secret
    }

    /// The public identity commitment.
    pub fn commitment(&self) -> Fr {
        self.commitment
    }
}

impl Drop for Identity {
    fn drop(&mut self) {
        self.trapdoor.zeroize();
        self.nullifier_secret.zeroize();
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("commitment", &poseidon::to_decimal(&self.commitment))
            .finish_non_exhaustive()
    }
}

fn reduce(context: &str, secret: &[u8]) -> Fr {
    let mut okm = blake3::derive_key(context, secret);
    let scalar = poseidon::field_from_digest(&okm);
    okm.zeroize();
    scalar
}

/// Derive an identity from a user secret.
///
/// The same secret always yields the same identity.
pub fn derive_identity(secret: &[u8]) -> Result<Identity> {
    if secret.is_empty() {
        return Err(IdentityError::InvalidSecret);
    }
    let trapdoor = reduce(contexts::IDENTITY_TRAPDOOR, secret);
    let nullifier_secret = reduce(contexts::IDENTITY_NULLIFIER, secret);
    Ok(Identity::from_secrets(trapdoor, nullifier_secret))
}

/// The public commitment of an identity.
pub fn commitment(identity: &Identity) -> Fr {
    identity.commitment()
}

/// Holds the session's unlocked identity.
#[derive(Default)]
pub struct IdentityStore {
    current: RwLock<Option<Identity>>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the identity for `secret` and keep it for this session.
    ///
    /// Replaces any identity already unlocked.
    pub fn unlock(&self, secret: &[u8]) -> Result<Fr> {
        let identity = derive_identity(secret)?;
        let commitment = identity.commitment();
        let mut slot = self.current.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(identity);
        tracing::info!(
            commitment = %poseidon::to_hex(&commitment),
            "identity unlocked"
        );
        Ok(commitment)
    }

    /// The unlocked identity.
    pub fn identity(&self) -> Result<Identity> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(IdentityError::Locked)
    }

    pub fn is_unlocked(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Drop the unlocked identity.
    pub fn lock(&self) {
        let mut slot = self.current.write().unwrap_or_else(|e| e.into_inner());
        if slot.take().is_some() {
            tracing::info!("identity locked");
        }
    }
}
