//! Fixed-depth Poseidon Merkle tree over identity commitments.
//!
//! Only the occupied prefix of each level is stored. Any node to the right of
//! it is the root of an empty subtree and is read from the precomputed zero
//! hashes, so a depth-20 tree with a handful of members costs a handful of
//! hashes per level instead of a million.

use std::collections::HashMap;
use std::sync::OnceLock;

use murmur_crypto::{poseidon, Fr};
use murmur_types::MAX_TREE_DEPTH;

use crate::proof::{MerkleInclusionProof, PathNode, Side};
use crate::snapshot::MembershipSnapshot;
use crate::{RegistryError, Result};

/// Empty-subtree roots: `zeros[0]` is the zero leaf, `zeros[i + 1] = H(zeros[i], zeros[i])`.
///
/// Returns `depth + 1` entries.
pub fn zero_hashes(depth: usize) -> &'static [Fr] {
    static ZEROS: OnceLock<Vec<Fr>> = OnceLock::new();
    let all = ZEROS.get_or_init(|| {
        let mut zeros = Vec::with_capacity(MAX_TREE_DEPTH + 1);
        let mut node = Fr::from(0u64);
        zeros.push(node);
        for _ in 0..MAX_TREE_DEPTH {
            node = poseidon::hash(node, node);
            zeros.push(node);
        }
        zeros
    });
    &all[..=depth.min(MAX_TREE_DEPTH)]
}

fn check_depth(depth: usize) -> Result<()> {
    if depth == 0 || depth > MAX_TREE_DEPTH {
        return Err(RegistryError::InvalidDepth(depth));
    }
    Ok(())
}

fn capacity_of(depth: usize) -> u64 {
    1u64 << depth
}

fn check_capacity(depth: usize, len: usize) -> Result<()> {
    let capacity = capacity_of(depth);
    if len as u64 > capacity {
        return Err(RegistryError::CapacityExceeded { capacity });
    }
    Ok(())
}

/// Occupied node prefix of every level, leaves at level 0.
#[derive(Clone, Debug)]
struct Levels {
    depth: usize,
    nodes: Vec<Vec<Fr>>,
}

impl Levels {
    fn build(depth: usize, leaves: Vec<Fr>) -> Self {
        let zeros = zero_hashes(depth);
        let mut nodes = Vec::with_capacity(depth + 1);
        nodes.push(leaves);
        for level in 0..depth {
            let next: Vec<Fr> = nodes[level]
                .chunks(2)
                .map(|pair| {
                    let right = pair.get(1).copied().unwrap_or(zeros[level]);
                    poseidon::hash(pair[0], right)
                })
                .collect();
            nodes.push(next);
        }
        Self { depth, nodes }
    }

    fn node(&self, level: usize, index: usize) -> Fr {
        self.nodes[level]
            .get(index)
            .copied()
            .unwrap_or(zero_hashes(self.depth)[level])
    }

    fn root(&self) -> Fr {
        self.node(self.depth, 0)
    }

    fn leaves(&self) -> &[Fr] {
        &self.nodes[0]
    }

    fn push(&mut self, leaf: Fr) -> usize {
        self.nodes[0].push(leaf);
        let position = self.nodes[0].len() - 1;
        let mut index = position;
        for level in 0..self.depth {
            let parent = index / 2;
            let hash = poseidon::hash(self.node(level, parent * 2), self.node(level, parent * 2 + 1));
            let above = &mut self.nodes[level + 1];
            if parent < above.len() {
                above[parent] = hash;
            } else {
                above.push(hash);
            }
            index = parent;
        }
        position
    }

    fn proof(&self, leaf_index: usize) -> MerkleInclusionProof {
        let mut siblings = Vec::with_capacity(self.depth);
        let mut index = leaf_index;
        for level in 0..self.depth {
            let side = if index % 2 == 0 { Side::Right } else { Side::Left };
            siblings.push(PathNode {
                sibling: self.node(level, index ^ 1),
                side,
            });
            index /= 2;
        }
        MerkleInclusionProof {
            leaf_index,
            leaf: self.nodes[0][leaf_index],
            root: self.root(),
            siblings,
        }
    }
}

/// Build an inclusion proof for `target` over an ordered commitment list.
///
/// The list is padded with the zero leaf up to `2^depth`. When `target`
/// occurs more than once the proof is built against its first occurrence.
pub fn build_proof(commitments: &[Fr], target: Fr, depth: usize) -> Result<MerkleInclusionProof> {
    check_depth(depth)?;
    check_capacity(depth, commitments.len())?;

    let position = commitments
        .iter()
        .position(|c| *c == target)
        .ok_or(RegistryError::CommitmentNotFound)?;
    let occurrences = commitments.iter().filter(|c| **c == target).count();
    if occurrences > 1 {
        tracing::warn!(
            occurrences,
            leaf_index = position,
            "duplicate commitment in registry, proving first occurrence"
        );
    }

    let levels = Levels::build(depth, commitments.to_vec());
    Ok(levels.proof(position))
}

/// The stateful membership registry.
#[derive(Clone, Debug)]
pub struct MembershipTree {
    levels: Levels,
    positions: HashMap<Fr, usize>,
}

impl MembershipTree {
    /// An empty tree of the given depth.
    pub fn new(depth: usize) -> Result<Self> {
        check_depth(depth)?;
        Ok(Self {
            levels: Levels::build(depth, Vec::new()),
            positions: HashMap::new(),
        })
    }

    /// A tree holding `leaves` in order.
    pub fn from_commitments(depth: usize, leaves: &[Fr]) -> Result<Self> {
        check_depth(depth)?;
        check_capacity(depth, leaves.len())?;
        let mut positions = HashMap::with_capacity(leaves.len());
        for (index, leaf) in leaves.iter().enumerate() {
            if let Some(first) = positions.insert(*leaf, index) {
                return Err(RegistryError::DuplicateCommitment(first));
            }
        }
        Ok(Self {
            levels: Levels::build(depth, leaves.to_vec()),
            positions,
        })
    }

    /// Rebuild a tree from a snapshot, using `default_depth` when the
    /// snapshot does not record one.
    pub fn from_snapshot(snapshot: &MembershipSnapshot, default_depth: usize) -> Result<Self> {
        Self::from_commitments(
            snapshot.depth.unwrap_or(default_depth),
            &snapshot.commitments,
        )
    }

    /// The leaf index `commitment` would be appended at, without appending.
    pub fn next_index(&self, commitment: &Fr) -> Result<usize> {
        if let Some(existing) = self.positions.get(commitment) {
            return Err(RegistryError::DuplicateCommitment(*existing));
        }
        if self.len() as u64 >= self.capacity() {
            return Err(RegistryError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }
        Ok(self.len())
    }

    /// Append a commitment, returning its leaf index.
    pub fn append(&mut self, commitment: Fr) -> Result<usize> {
        self.next_index(&commitment)?;
        let index = self.levels.push(commitment);
        self.positions.insert(commitment, index);
        tracing::debug!(
            leaf_index = index,
            root = %poseidon::to_hex(&self.root()),
            "registry: commitment appended"
        );
        Ok(index)
    }

    pub fn root(&self) -> Fr {
        self.levels.root()
    }

    pub fn depth(&self) -> usize {
        self.levels.depth
    }

    pub fn capacity(&self) -> u64 {
        capacity_of(self.depth())
    }

    pub fn len(&self) -> usize {
        self.levels.leaves().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Commitments in registration order.
    pub fn leaves(&self) -> &[Fr] {
        self.levels.leaves()
    }

    pub fn index_of(&self, commitment: &Fr) -> Option<usize> {
        self.positions.get(commitment).copied()
    }

    pub fn contains(&self, commitment: &Fr) -> bool {
        self.positions.contains_key(commitment)
    }

    /// Inclusion proof for a registered commitment.
    pub fn proof_for(&self, commitment: &Fr) -> Result<MerkleInclusionProof> {
        let index = self
            .index_of(commitment)
            .ok_or(RegistryError::CommitmentNotFound)?;
        Ok(self.levels.proof(index))
    }

    /// Inclusion proof for the leaf at `index`.
    pub fn proof_at(&self, index: usize) -> Result<MerkleInclusionProof> {
        if index >= self.len() {
            return Err(RegistryError::CommitmentNotFound);
        }
        Ok(self.levels.proof(index))
    }

    pub fn snapshot(&self) -> MembershipSnapshot {
        MembershipSnapshot {
            depth: Some(self.depth()),
            commitments: self.leaves().to_vec(),
        }
    }
}
