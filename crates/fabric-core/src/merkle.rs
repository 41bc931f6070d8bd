//! Binary Merkle tree over a ledger preimage.
//!
//! - Leaf node: `SHA256(leaf_bytes)`
//! - Parent: `SHA256(left || right)`
//! - Odd node count on a level: the last node is paired with itself
//! - No leaves: root is [`Sha256Hash::ZERO`]
//!
//! A proof lists the sibling hashes from leaf to root, each tagged with the
//! side it sits on.

use serde::{Deserialize, Serialize};

use crate::crypto::Sha256Hash;

/// Which side of the running hash a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Right,
}

/// One step of an inclusion proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub position: Position,
    pub hash: Sha256Hash,
}

/// Inclusion proof for a single leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub steps: Vec<ProofStep>,
}

impl MerkleProof {
    /// Recompute the root from `leaf` and compare it to `root`.
    pub fn verify(&self, leaf: &[u8], root: &Sha256Hash) -> bool {
        let mut acc = Sha256Hash::hash(leaf);
        for step in &self.steps {
            acc = match step.position {
                Position::Left => Sha256Hash::hash_pair(&step.hash.0, &acc.0),
                Position::Right => Sha256Hash::hash_pair(&acc.0, &step.hash.0),
            };
        }
        acc == *root
    }
}

/// A fully materialized tree. `levels[0]` holds the leaf nodes.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    levels: Vec<Vec<Sha256Hash>>,
}

impl MerkleTree {
    pub fn new<L: AsRef<[u8]>>(leaves: &[L]) -> Self {
        let mut levels = vec![leaves
            .iter()
            .map(|leaf| Sha256Hash::hash(leaf.as_ref()))
            .collect::<Vec<_>>()];

        while levels[levels.len() - 1].len() > 1 {
            let nodes = &levels[levels.len() - 1];
            let parents = nodes
                .chunks(2)
                .map(|pair| {
                    let right = pair.get(1).unwrap_or(&pair[0]);
                    Sha256Hash::hash_pair(&pair[0].0, &right.0)
                })
                .collect();
            levels.push(parents);
        }

        Self { levels }
    }

    pub fn root(&self) -> Sha256Hash {
        self.levels
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or(Sha256Hash::ZERO)
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Build the inclusion proof for leaf `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut steps = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut idx = index;
        for nodes in &self.levels[..self.levels.len() - 1] {
            let step = if idx % 2 == 0 {
                // A missing right sibling is the duplicated node itself.
                let sibling = nodes.get(idx + 1).unwrap_or(&nodes[idx]);
                ProofStep {
                    position: Position::Right,
                    hash: *sibling,
                }
            } else {
                ProofStep {
                    position: Position::Left,
                    hash: nodes[idx - 1],
                }
            };
            steps.push(step);
            idx /= 2;
        }

        Some(MerkleProof { steps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaves(n: usize) -> Vec<Vec<u8>> {
        (0..n).map(|i| format!("leaf-{}", i).into_bytes()).collect()
    }

    #[test]
    fn test_empty_tree_root_is_zero() {
        let tree = MerkleTree::new::<Vec<u8>>(&[]);
        assert_eq!(tree.root(), Sha256Hash::ZERO);
        assert!(tree.proof(0).is_none());
    }

    #[test]
    fn test_single_leaf_root_is_leaf_hash() {
        let tree = MerkleTree::new(&[b"only".to_vec()]);
        assert_eq!(tree.root(), Sha256Hash::hash(b"only"));
        assert!(tree.proof(0).unwrap().steps.is_empty());
    }

    #[test]
    fn test_odd_count_duplicates_last() {
        let l = leaves(3);
        let h: Vec<_> = l.iter().map(|x| Sha256Hash::hash(x)).collect();
        let left = Sha256Hash::hash_pair(&h[0].0, &h[1].0);
        let right = Sha256Hash::hash_pair(&h[2].0, &h[2].0);
        let expected = Sha256Hash::hash_pair(&left.0, &right.0);

        assert_eq!(MerkleTree::new(&l).root(), expected);
    }

    #[test]
    fn test_absent_leaf_fails() {
        let l = leaves(3);
        let tree = MerkleTree::new(&l);
        let root = tree.root();
        for i in 0..3 {
            assert!(!tree.proof(i).unwrap().verify(&[0u8; 32], &root));
        }
    }

    #[test]
    fn test_proof_against_wrong_root_fails() {
        let l = leaves(4);
        let tree = MerkleTree::new(&l);
        let proof = tree.proof(1).unwrap();
        assert!(!proof.verify(&l[1], &Sha256Hash::hash(b"other root")));
    }

    proptest! {
        #[test]
        fn prop_every_leaf_proves(n in 1usize..40) {
            let l = leaves(n);
            let tree = MerkleTree::new(&l);
            let root = tree.root();
            for (i, leaf) in l.iter().enumerate() {
                prop_assert!(tree.proof(i).unwrap().verify(leaf, &root));
            }
        }
    }
}
