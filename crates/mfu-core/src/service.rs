//! Proof lookup by file index

use std::sync::Arc;
use tracing::{debug, error};

use crate::hash::HashFn;
use crate::proof::ProofElement;
use crate::repository::{Repository, RepositoryError, StoredFile};

#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    #[error("no file stored at index {0}")]
    NotFound(u64),
    #[error("file {index} is missing from the merkle tree of batch {batch}")]
    BlockNotInTree { index: u64, batch: u64 },
    #[error("while reading storage: {0}")]
    Repository(#[source] RepositoryError),
}

impl From<RepositoryError> for ProofError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(index) => ProofError::NotFound(index),
            other => ProofError::Repository(other),
        }
    }
}

/// Serves inclusion proofs for stored files.
///
/// The caller verifies against a root it pinned itself; nothing here vouches
/// for the server's own root.
pub struct ProofService {
    repository: Arc<dyn Repository>,
    hash: Arc<dyn HashFn>,
}

impl ProofService {
    pub fn new(repository: Arc<dyn Repository>, hash: Arc<dyn HashFn>) -> Self {
        Self { repository, hash }
    }

    pub async fn proof_for_index(&self, index: u64) -> Result<Vec<ProofElement>, ProofError> {
        let snapshot = self.repository.snapshot(index).await?;

        match snapshot
            .tree
            .find_proof(&snapshot.file.content, self.hash.as_ref())
        {
            Some(proof) => {
                debug!(
                    "Proof for index {} (batch {}): {} elements, root {}",
                    index,
                    snapshot.batch,
                    proof.len(),
                    snapshot.tree.root_hash().short()
                );
                Ok(proof)
            }
            None => {
                error!("File {} not found in tree of batch {}", index, snapshot.batch);
                Err(ProofError::BlockNotInTree {
                    index,
                    batch: snapshot.batch,
                })
            }
        }
    }

    pub async fn file_at(&self, index: u64) -> Result<StoredFile, ProofError> {
        Ok(self.repository.retrieve_file_by_index(index).await?)
    }
}
