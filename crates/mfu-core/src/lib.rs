//! mfu-core - merkle proofs for verifiable file uploads
//!
//! A client uploads a batch of files and pins the root of the merkle tree built
//! over their contents. Later it downloads any single file with an inclusion
//! proof and checks it against the pinned root, without touching the rest of
//! the batch.
//!
//! # Overview
//!
//! - [`Tree::build`] builds a balanced binary tree over ordered blocks
//! - [`Tree::find_proof`] / [`Tree::proof_for`] extract the sibling path of a block
//! - [`verify`] replays a path against a trusted root
//! - [`UploadCoordinator`] and [`ProofService`] run those over a [`Repository`]
//!
//! The hash function is always passed in explicitly via [`HashFn`].
//!
//! # Example
//!
//! ```rust
//! use mfu_core::{verify, HashAlgorithm, Tree};
//!
//! let hash = HashAlgorithm::Sha256;
//! let blocks = ["A", "B", "C", "D", "E", "F"];
//! let tree = Tree::build(&blocks, &hash).unwrap();
//!
//! let proof = tree.proof_for(b"C", &hash);
//! assert_eq!(proof.len(), 3);
//! assert!(verify(tree.root_hash(), b"C", &proof, &hash));
//! assert!(!verify(tree.root_hash(), b"c", &proof, &hash));
//! ```

pub mod hash;
pub mod memory;
pub mod node;
pub mod proof;
pub mod repository;
pub mod service;
pub mod tree;
pub mod upload;

pub use hash::{sha256, Digest, DigestParseError, HashAlgorithm, HashFn};
pub use memory::MemoryRepository;
pub use node::Node;
pub use proof::{verify, Position, ProofElement};
pub use repository::{NewFile, Repository, RepositoryError, Snapshot, StoredFile};
pub use service::{ProofError, ProofService};
pub use tree::{root_of, Tree, TreeError};
pub use upload::{UploadCoordinator, UploadError, UploadReceipt, UploadedFile};
