//! Merkle inclusion proofs.

use murmur_crypto::{poseidon, Fr};

/// Which side of the running node a sibling sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// One level of an inclusion path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathNode {
    pub sibling: Fr,
    pub side: Side,
}

impl PathNode {
    /// Combine the running node with this sibling.
    pub fn fold(&self, node: Fr) -> Fr {
        match self.side {
            Side::Left => poseidon::hash(self.sibling, node),
            Side::Right => poseidon::hash(node, self.sibling),
        }
    }
}

/// Leaf-to-root authentication path for one commitment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleInclusionProof {
    pub leaf_index: usize,
    pub leaf: Fr,
    pub root: Fr,
    /// Ordered from the leaf level upwards; one entry per level.
    pub siblings: Vec<PathNode>,
}

impl MerkleInclusionProof {
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// Replay the sibling chain from the leaf.
    pub fn compute_root(&self) -> Fr {
        self.siblings
            .iter()
            .fold(self.leaf, |node, level| level.fold(node))
    }

    /// Check that the path reproduces `root`.
    ///
    /// Also rejects a proof whose recorded root disagrees with its path.
    pub fn verify(&self, root: Fr) -> bool {
        let computed = self.compute_root();
        computed == root && computed == self.root
    }

    /// Direction bits for the proving circuit: `true` where the running node
    /// is the right child.
    pub fn path_bits(&self) -> Vec<bool> {
        self.siblings
            .iter()
            .map(|level| level.side == Side::Left)
            .collect()
    }

    /// Sibling hashes from the leaf level upwards.
    pub fn sibling_hashes(&self) -> Vec<Fr> {
        self.siblings.iter().map(|level| level.sibling).collect()
    }
}
