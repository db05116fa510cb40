//! Balanced binary hash tree over an ordered sequence of blocks

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash::{Digest, HashFn};
use crate::node::Node;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("cannot build a merkle tree from empty data")]
    EmptyInput,
    #[error("tree contains a node with a single child")]
    OneChildNode,
}

/// Immutable merkle tree. Leaf order is the order blocks were given to [`Tree::build`].
///
/// Deserializing rejects trees with one-child nodes, since their leaves have no proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTree")]
pub struct Tree {
    root: Node,
    leaf_count: usize,
}

#[derive(Deserialize)]
struct RawTree {
    root: Node,
    leaf_count: usize,
}

impl TryFrom<RawTree> for Tree {
    type Error = TreeError;

    fn try_from(raw: RawTree) -> Result<Self, Self::Error> {
        if !raw.root.is_full() {
            return Err(TreeError::OneChildNode);
        }
        Ok(Tree {
            root: raw.root,
            leaf_count: raw.leaf_count,
        })
    }
}

impl Tree {
    /// Build a tree over `blocks`.
    ///
    /// Leaves are `hash(block)`. Each level with an odd node count gets a copy of
    /// its last node appended before adjacent pairs are combined left to right,
    /// until a single root remains. One block yields a root equal to its leaf.
    pub fn build<B, H>(blocks: &[B], hash: &H) -> Result<Self, TreeError>
    where
        B: AsRef<[u8]>,
        H: HashFn + ?Sized,
    {
        if blocks.is_empty() {
            return Err(TreeError::EmptyInput);
        }

        let mut level: Vec<Node> = blocks
            .iter()
            .map(|block| Node::leaf(block.as_ref(), hash))
            .collect();

        while level.len() > 1 {
            if level.len() % 2 == 1 {
                let last = level[level.len() - 1].clone();
                level.push(last);
            }

            let mut next = Vec::with_capacity(level.len() / 2);
            let mut nodes = level.into_iter();
            while let (Some(left), Some(right)) = (nodes.next(), nodes.next()) {
                next.push(Node::branch(left, Some(right), hash));
            }
            level = next;
        }

        let root = level.pop().ok_or(TreeError::EmptyInput)?;
        Ok(Tree {
            root,
            leaf_count: blocks.len(),
        })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_hash(&self) -> &Digest {
        self.root.hash()
    }

    /// Number of blocks the tree was built from (padding copies excluded)
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Levels above the leaves; also the length of every inclusion proof
    pub fn depth(&self) -> usize {
        self.root.height()
    }
}

/// Root hash of `blocks` without keeping the tree around
pub fn root_of<B, H>(blocks: &[B], hash: &H) -> Result<Digest, TreeError>
where
    B: AsRef<[u8]>,
    H: HashFn + ?Sized,
{
    Tree::build(blocks, hash).map(|tree| tree.root_hash().clone())
}
