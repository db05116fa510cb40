//! Whole-batch upload: replace stored files, rebuild and persist the tree

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::hash::{Digest, HashFn};
use crate::repository::{NewFile, Repository, RepositoryError};
use crate::tree::{Tree, TreeError};

/// Name and assigned index of an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub index: u64,
}

/// Result of a committed batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub files: Vec<UploadedFile>,
    pub root: Digest,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("while resetting storage: {0}")]
    ResetStorage(#[source] RepositoryError),
    #[error("while storing file {name}: {source}")]
    StoreFile {
        name: String,
        #[source]
        source: RepositoryError,
    },
    #[error("while storing tree: {0}")]
    StoreTree(#[source] RepositoryError),
}

/// Runs upload batches one at a time against a [`Repository`].
pub struct UploadCoordinator {
    repository: Arc<dyn Repository>,
    hash: Arc<dyn HashFn>,
    gate: Mutex<()>,
}

impl UploadCoordinator {
    pub fn new(repository: Arc<dyn Repository>, hash: Arc<dyn HashFn>) -> Self {
        Self {
            repository,
            hash,
            gate: Mutex::new(()),
        }
    }

    /// Replace the stored file set with `files`, in order, and return the new root.
    ///
    /// Any failing step aborts the batch; the repository keeps serving the
    /// previously published batch.
    pub async fn upload(&self, files: Vec<NewFile>) -> Result<UploadReceipt, UploadError> {
        if files.is_empty() {
            return Err(TreeError::EmptyInput.into());
        }

        let _batch = self.gate.lock().await;

        self.repository
            .delete_all_files()
            .await
            .map_err(UploadError::ResetStorage)?;

        let mut uploaded = Vec::with_capacity(files.len());
        let mut blocks = Vec::with_capacity(files.len());
        for file in files {
            let name = file.name.clone();
            let content = file.content.clone();
            let index = self
                .repository
                .store_file(file)
                .await
                .map_err(|source| UploadError::StoreFile {
                    name: name.clone(),
                    source,
                })?;
            debug!("Stored {} ({} bytes) at index {}", name, content.len(), index);
            uploaded.push(UploadedFile { name, index });
            blocks.push(content);
        }

        let tree = Tree::build(&blocks, self.hash.as_ref())?;
        let root = tree.root_hash().clone();

        self.repository
            .store_tree(tree)
            .await
            .map_err(UploadError::StoreTree)?;

        info!("Uploaded batch of {} files, merkle root {}", uploaded.len(), root);

        Ok(UploadReceipt {
            files: uploaded,
            root,
        })
    }
}
