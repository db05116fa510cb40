//! Inclusion proofs: generation from a [`Tree`] and verification against a trusted root

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::hash::{Digest, HashFn};
use crate::node::Node;
use crate::tree::Tree;

/// Side the sibling occupies relative to the hash being accumulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    /// Sibling is concatenated before the accumulated hash
    #[serde(rename = "L")]
    Left,
    /// Sibling is concatenated after the accumulated hash
    #[serde(rename = "R")]
    Right,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Left => "L",
            Position::Right => "R",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "L" => Ok(Position::Left),
            "R" => Ok(Position::Right),
            _ => Err(format!("invalid proof position: {}", s)),
        }
    }
}

/// One step of an inclusion proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofElement {
    #[serde(rename = "hash")]
    pub sibling_hash: Digest,
    pub position: Position,
}

impl ProofElement {
    pub fn left(sibling_hash: Digest) -> Self {
        ProofElement {
            sibling_hash,
            position: Position::Left,
        }
    }

    pub fn right(sibling_hash: Digest) -> Self {
        ProofElement {
            sibling_hash,
            position: Position::Right,
        }
    }
}

impl Tree {
    /// Sibling path from the leaf matching `hash(block)` up to the root, or `None`
    /// when no node carries that hash.
    ///
    /// Depth-first, left before right; with duplicate blocks the leftmost leaf wins.
    pub fn find_proof<H: HashFn + ?Sized>(&self, block: &[u8], hash: &H) -> Option<Vec<ProofElement>> {
        let target = hash.hash(block);
        find_path(self.root(), &target)
    }

    /// Like [`Tree::find_proof`] but an absent block yields an empty proof,
    /// which only verifies if the block hashes to the root itself.
    pub fn proof_for<H: HashFn + ?Sized>(&self, block: &[u8], hash: &H) -> Vec<ProofElement> {
        self.find_proof(block, hash).unwrap_or_default()
    }
}

fn find_path(node: &Node, target: &Digest) -> Option<Vec<ProofElement>> {
    if node.hash() == target {
        return Some(Vec::new());
    }

    if let Some(left) = node.left() {
        if let Some(mut path) = find_path(left, target) {
            // a one-child node has no sibling to record
            if let Some(right) = node.right() {
                path.push(ProofElement::right(right.hash().clone()));
            }
            return Some(path);
        }
    }

    if let Some(right) = node.right() {
        if let Some(mut path) = find_path(right, target) {
            if let Some(left) = node.left() {
                path.push(ProofElement::left(left.hash().clone()));
            }
            return Some(path);
        }
    }

    None
}

/// Replay `proof` from `hash(block)` and compare the result with `root`.
///
/// A proof that does not verify is an expected outcome, not an error.
pub fn verify<H: HashFn + ?Sized>(root: &Digest, block: &[u8], proof: &[ProofElement], hash: &H) -> bool {
    let mut current = hash.hash(block);
    for element in proof {
        current = match element.position {
            Position::Left => hash.combine(&element.sibling_hash, &current),
            Position::Right => hash.combine(&current, &element.sibling_hash),
        };
    }
    &current == root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{sha256, HashAlgorithm};

    const H: HashAlgorithm = HashAlgorithm::Sha256;

    #[test]
    fn test_position_wire_tags() {
        assert_eq!(Position::Left.as_str(), "L");
        assert_eq!("R".parse::<Position>().unwrap(), Position::Right);
        assert!("X".parse::<Position>().is_err());
    }

    #[test]
    fn test_two_leaf_proofs() {
        let tree = Tree::build(&["A", "B"], &H).unwrap();

        let proof_a = tree.proof_for(b"A", &H);
        assert_eq!(proof_a, vec![ProofElement::right(sha256(b"B"))]);

        let proof_b = tree.proof_for(b"B", &H);
        assert_eq!(proof_b, vec![ProofElement::left(sha256(b"A"))]);

        assert!(verify(tree.root_hash(), b"A", &proof_a, &H));
        assert!(verify(tree.root_hash(), b"B", &proof_b, &H));
    }

    #[test]
    fn test_swapped_positions_fail() {
        let tree = Tree::build(&["A", "B"], &H).unwrap();
        let wrong = vec![ProofElement::left(sha256(b"B"))];
        assert!(!verify(tree.root_hash(), b"A", &wrong, &H));
    }

    #[test]
    fn test_absent_block() {
        let tree = Tree::build(&["A", "B", "C"], &H).unwrap();
        assert_eq!(tree.find_proof(b"X", &H), None);
        assert!(tree.proof_for(b"X", &H).is_empty());
        assert!(!verify(tree.root_hash(), b"X", &[], &H));
    }

    #[test]
    fn test_single_block_proof_is_empty_and_verifies() {
        let tree = Tree::build(&["A"], &H).unwrap();
        let proof = tree.find_proof(b"A", &H).unwrap();
        assert!(proof.is_empty());
        assert!(verify(tree.root_hash(), b"A", &proof, &H));
    }

    #[test]
    fn test_proof_json_shape() {
        let element = ProofElement::left(sha256(b"A"));
        let json = serde_json::to_value(&element).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "hash": sha256(b"A").as_str(), "position": "L" })
        );
    }
}
