//! # Lean Incremental Merkle Tree
//!
//! The identity, DSC and CSCA trees are LeanIMTs over Poseidon2: a binary
//! tree whose levels are stored explicitly and whose depth grows with the
//! leaf count. The tree service exports it as JSON, one array per level from
//! the leaves up, each node a decimal field element:
//!
//! ```text
//! [["leaf0", "leaf1", "leaf2"], ["n01", "leaf2"], ["root"]]
//! ```
//!
//! ## Algorithm
//!
//! - Node: `Poseidon2(left, right)`.
//! - A node without a right sibling is carried to the next level unchanged.
//! - The root is the single node of the last level; an empty tree has none.
//!
//! ## Security Invariant
//!
//! `import` checks the level shape (each level is half the size of the one
//! below, rounded up) but trusts node values, matching how the tree is
//! served. Use [`LeanImt::verify`] to recompute every internal node when the
//! source is not trusted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use zkid_core::CryptoError;

use crate::field::FieldElement;
use crate::poseidon::poseidon2;

/// Errors from tree import, update or proof generation.
#[derive(Error, Debug)]
pub enum TreeError {
    /// The export is not valid JSON or contains a non-field value.
    #[error("malformed tree export: {0}")]
    Json(#[from] serde_json::Error),

    /// Level sizes are inconsistent with a LeanIMT.
    #[error("invalid tree shape: {0}")]
    Shape(String),

    /// Node hashing failed.
    #[error("tree hash error: {0}")]
    Hash(#[from] CryptoError),

    #[error("leaf index {index} out of range for tree of size {size}")]
    IndexOutOfRange { index: usize, size: usize },
}

/// A LeanIMT held in memory, level by level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeanImt {
    levels: Vec<Vec<FieldElement>>,
}

impl Default for LeanImt {
    fn default() -> Self {
        Self::new()
    }
}

impl LeanImt {
    /// An empty tree.
    pub fn new() -> Self {
        Self {
            levels: vec![Vec::new()],
        }
    }

    /// Reconstruct a tree from its JSON export.
    pub fn import(json: &str) -> Result<Self, TreeError> {
        let mut levels: Vec<Vec<FieldElement>> = serde_json::from_str(json)?;
        if levels.is_empty() {
            levels.push(Vec::new());
        }
        Self::check_shape(&levels)?;
        Ok(Self { levels })
    }

    fn check_shape(levels: &[Vec<FieldElement>]) -> Result<(), TreeError> {
        for (depth, pair) in levels.windows(2).enumerate() {
            let expected = pair[0].len().div_ceil(2);
            if pair[0].len() < 2 || pair[1].len() != expected {
                return Err(TreeError::Shape(format!(
                    "level {} has {} nodes, expected {expected} above {} nodes",
                    depth + 1,
                    pair[1].len(),
                    pair[0].len()
                )));
            }
        }
        let top = levels.last().map(Vec::len).unwrap_or(0);
        if top > 1 {
            return Err(TreeError::Shape(format!(
                "top level has {top} nodes, expected at most one"
            )));
        }
        Ok(())
    }

    /// JSON export in the same format `import` reads.
    pub fn export(&self) -> Result<String, TreeError> {
        Ok(serde_json::to_string(&self.levels)?)
    }

    /// Number of leaves.
    pub fn size(&self) -> usize {
        self.levels[0].len()
    }

    /// Number of levels above the leaves.
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn leaves(&self) -> &[FieldElement] {
        &self.levels[0]
    }

    /// Current root, `None` for an empty tree.
    pub fn root(&self) -> Option<FieldElement> {
        self.levels.last().and_then(|level| level.first()).copied()
    }

    /// Index of `leaf`, by linear scan of the leaf level.
    pub fn index_of(&self, leaf: &FieldElement) -> Option<usize> {
        self.levels[0].iter().position(|l| l == leaf)
    }

    pub fn contains(&self, leaf: &FieldElement) -> bool {
        self.index_of(leaf).is_some()
    }

    /// Append a leaf and update the path to the root.
    pub fn insert(&mut self, leaf: FieldElement) -> Result<(), TreeError> {
        self.levels[0].push(leaf);
        let mut index = self.levels[0].len() - 1;
        let mut level = 0;

        while self.levels[level].len() > 1 {
            let parent = index / 2;
            let left = parent * 2;
            let nodes = &self.levels[level];
            let value = match nodes.get(left + 1) {
                Some(right) => poseidon2(&nodes[left], right)?,
                None => nodes[left],
            };

            if self.levels.len() == level + 1 {
                self.levels.push(Vec::new());
            }
            let above = &mut self.levels[level + 1];
            if parent < above.len() {
                above[parent] = value;
            } else {
                above.push(value);
            }

            index = parent;
            level += 1;
        }
        Ok(())
    }

    /// Recompute every internal node and compare with the stored values.
    pub fn verify(&self) -> Result<bool, TreeError> {
        for level in 0..self.depth() {
            let below = &self.levels[level];
            let above = &self.levels[level + 1];
            for (i, stored) in above.iter().enumerate() {
                let expected = match below.get(2 * i + 1) {
                    Some(right) => poseidon2(&below[2 * i], right)?,
                    None => below[2 * i],
                };
                if &expected != stored {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Inclusion proof for the leaf at `index`.
    pub fn generate_proof(&self, index: usize) -> Result<MerkleProof, TreeError> {
        let size = self.size();
        if index >= size {
            return Err(TreeError::IndexOutOfRange { index, size });
        }
        let root = self
            .root()
            .ok_or(TreeError::IndexOutOfRange { index, size })?;

        let mut siblings = Vec::new();
        let mut path = Vec::new();
        let mut position = index;
        for level in 0..self.depth() {
            let nodes = &self.levels[level];
            let is_right = position % 2 == 1;
            let sibling = if is_right {
                nodes.get(position - 1)
            } else {
                nodes.get(position + 1)
            };
            if let Some(sibling) = sibling {
                siblings.push(*sibling);
                path.push(is_right);
            }
            position /= 2;
        }

        Ok(MerkleProof {
            root,
            leaf: self.levels[0][index],
            index,
            siblings,
            path,
        })
    }
}

/// Inclusion proof for a LeanIMT leaf. Levels where the node was carried up
/// without a sibling contribute no entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub root: FieldElement,
    pub leaf: FieldElement,
    pub index: usize,
    pub siblings: Vec<FieldElement>,
    /// `true` where the proven node is the right child.
    pub path: Vec<bool>,
}

impl MerkleProof {
    /// Recompute the root from the leaf and siblings.
    ///
    /// Returns `false` for malformed proofs rather than an error.
    pub fn verify(&self) -> bool {
        if self.siblings.len() != self.path.len() {
            return false;
        }
        let mut node = self.leaf;
        for (sibling, is_right) in self.siblings.iter().zip(&self.path) {
            let next = if *is_right {
                poseidon2(sibling, &node)
            } else {
                poseidon2(&node, sibling)
            };
            node = match next {
                Ok(n) => n,
                Err(_) => return false,
            };
        }
        node == self.root
    }
}
