//! Trusted setup output and key files.
//!
//! Keys are tied to one tree depth and stored as
//! `signal_<depth>.pk` / `signal_<depth>.vk` (compressed canonical encoding).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use murmur_crypto::groth16::{
    self, SerializedProvingKey, SerializedVerifyingKey, SignalProvingKey, SignalVerifyingKey,
};
use rand::{CryptoRng, RngCore};

use crate::circuit::SignalCircuit;
use crate::{Result, SignalError};

/// Proving and verification keys for one tree depth.
#[derive(Clone)]
pub struct SignalKeys {
    pub depth: usize,
    pub proving_key: Arc<SignalProvingKey>,
    pub verifying_key: SignalVerifyingKey,
}

pub fn proving_key_path(dir: &Path, depth: usize) -> PathBuf {
    dir.join(format!("signal_{depth}.pk"))
}

pub fn verifying_key_path(dir: &Path, depth: usize) -> PathBuf {
    dir.join(format!("signal_{depth}.vk"))
}

impl SignalKeys {
    /// Run the circuit-specific setup with OS randomness.
    pub fn setup(depth: usize) -> Result<Self> {
        Self::setup_with_rng(depth, &mut rand::rngs::OsRng)
    }

    pub fn setup_with_rng<R: RngCore + CryptoRng>(depth: usize, rng: &mut R) -> Result<Self> {
        if depth == 0 || depth > murmur_types::MAX_TREE_DEPTH {
            return Err(SignalError::Keys(format!("invalid tree depth {depth}")));
        }
        let (proving_key, verifying_key) = groth16::setup(SignalCircuit::blank(depth), rng)
            .map_err(|e| SignalError::Keys(e.to_string()))?;
        tracing::info!(depth, "signal circuit keys generated");
        Ok(Self {
            depth,
            proving_key: Arc::new(proving_key),
            verifying_key,
        })
    }

    /// Read both keys for `depth` from `dir`.
    pub fn load(dir: &Path, depth: usize) -> Result<Self> {
        let proving_key = SerializedProvingKey::load(&proving_key_path(dir, depth))
            .and_then(|k| k.to_key())
            .map_err(|e| SignalError::Keys(e.to_string()))?;
        let verifying_key = load_verifying_key(dir, depth)?;
        Ok(Self {
            depth,
            proving_key: Arc::new(proving_key),
            verifying_key,
        })
    }

    /// Write both keys into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(|e| SignalError::Keys(e.to_string()))?;
        SerializedProvingKey::from_key(&self.proving_key)
            .and_then(|k| k.save(&proving_key_path(dir, self.depth)))
            .map_err(|e| SignalError::Keys(e.to_string()))?;
        SerializedVerifyingKey::from_key(&self.verifying_key)
            .and_then(|k| k.save(&verifying_key_path(dir, self.depth)))
            .map_err(|e| SignalError::Keys(e.to_string()))?;
        tracing::info!(depth = self.depth, dir = %dir.display(), "signal circuit keys saved");
        Ok(())
    }
}

/// Read only the verification key for `depth` from `dir`.
pub fn load_verifying_key(dir: &Path, depth: usize) -> Result<SignalVerifyingKey> {
    SerializedVerifyingKey::load(&verifying_key_path(dir, depth))
        .and_then(|k| k.to_key())
        .map_err(|e| SignalError::Keys(e.to_string()))
}
