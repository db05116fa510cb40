//! Tree nodes

use serde::{Deserialize, Serialize};

use crate::hash::{Digest, HashFn};

/// A node owns its children exclusively; trees never share subtrees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    hash: Digest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    left: Option<Box<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    right: Option<Box<Node>>,
}

impl Node {
    /// Leaf holding `hash(block)`
    pub fn leaf<H: HashFn + ?Sized>(block: &[u8], hash: &H) -> Self {
        Node {
            hash: hash.hash(block),
            left: None,
            right: None,
        }
    }

    /// Internal node over `left` and `right`.
    ///
    /// Without a right child the hash is `H(left.hash)`, never a self-concatenation.
    /// Such a node has no sibling to put in a proof step, so leaves under it
    /// cannot be proven. [`crate::Tree`] never builds one and refuses to load one.
    pub fn branch<H: HashFn + ?Sized>(left: Node, right: Option<Node>, hash: &H) -> Self {
        let digest = match &right {
            Some(right) => hash.combine(&left.hash, &right.hash),
            None => hash.hash(left.hash.as_bytes()),
        };
        Node {
            hash: digest,
            left: Some(Box::new(left)),
            right: right.map(Box::new),
        }
    }

    pub fn hash(&self) -> &Digest {
        &self.hash
    }

    pub fn left(&self) -> Option<&Node> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&Node> {
        self.right.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// True when every node at or below this one is a leaf or has both children
    pub fn is_full(&self) -> bool {
        match (self.left(), self.right()) {
            (None, None) => true,
            (Some(left), Some(right)) => left.is_full() && right.is_full(),
            _ => false,
        }
    }

    /// Number of edges from this node down to its leftmost leaf
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut node = self;
        while let Some(left) = node.left() {
            height += 1;
            node = left;
        }
        height
    }

    /// Recompute every hash below this node and compare with the stored values.
    pub fn is_consistent<H: HashFn + ?Sized>(&self, hash: &H) -> bool {
        match (self.left(), self.right()) {
            (None, None) => true,
            (Some(left), Some(right)) => {
                hash.combine(left.hash(), right.hash()) == self.hash
                    && left.is_consistent(hash)
                    && right.is_consistent(hash)
            }
            (Some(left), None) => {
                hash.hash(left.hash().as_bytes()) == self.hash && left.is_consistent(hash)
            }
            (None, Some(_)) => false,
        }
    }
}
