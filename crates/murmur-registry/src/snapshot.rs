//! Commitment list files.
//!
//! Two shapes are read:
//!
//! ```json
//! { "depth": 20, "commitments": ["1234...", "5678..."] }
//! ["1234...", "5678..."]
//! ```
//!
//! Commitments are decimal strings (`0x` hex is also accepted on read).
//! The object form is always written.

use std::path::Path;

use murmur_crypto::{poseidon, Fr};
use serde::{Deserialize, Serialize};

use crate::{RegistryError, Result};

/// An ordered list of registered commitments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MembershipSnapshot {
    /// Tree depth, if the file records one.
    pub depth: Option<usize>,
    pub commitments: Vec<Fr>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Bare(Vec<String>),
    Full {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        depth: Option<usize>,
        commitments: Vec<String>,
    },
}

impl MembershipSnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SnapshotFile =
            serde_json::from_str(json).map_err(|e| RegistryError::Snapshot(e.to_string()))?;
        let (depth, raw) = match file {
            SnapshotFile::Full { depth, commitments } => (depth, commitments),
            SnapshotFile::Bare(commitments) => (None, commitments),
        };
        let commitments = raw
            .iter()
            .enumerate()
            .map(|(i, s)| {
                poseidon::parse_field(s)
                    .map_err(|e| RegistryError::Snapshot(format!("commitment {i}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { depth, commitments })
    }

    pub fn to_json(&self) -> Result<String> {
        let file = SnapshotFile::Full {
            depth: self.depth,
            commitments: self.commitments.iter().map(poseidon::to_decimal).collect(),
        };
        serde_json::to_string_pretty(&file).map_err(|e| RegistryError::Snapshot(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            members = snapshot.commitments.len(),
            "loaded membership snapshot"
        );
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
