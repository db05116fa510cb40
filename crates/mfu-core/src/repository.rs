//! Storage contract for uploaded files and their merkle tree

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use crate::tree::Tree;

/// File content before the repository assigns it an index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    pub name: String,
    pub content: Bytes,
}

impl NewFile {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// A file of the committed batch; indices start at 1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub index: u64,
    pub name: String,
    pub content: Bytes,
}

/// Tree and file read from the same committed batch
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub batch: u64,
    pub tree: Arc<Tree>,
    pub file: StoredFile,
}

/// Batch-oriented storage.
///
/// Writes form a batch: `delete_all_files` opens it, `store_file` appends to it
/// and `store_tree` publishes files and tree together. Reads only ever see
/// published batches, so an abandoned batch leaves the previous one in place.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Start a new batch that will replace every stored file
    async fn delete_all_files(&self) -> Result<(), RepositoryError>;

    /// Append a file to the open batch, returning its index
    async fn store_file(&self, file: NewFile) -> Result<u64, RepositoryError>;

    async fn retrieve_file_by_index(&self, index: u64) -> Result<StoredFile, RepositoryError>;

    /// Publish the open batch together with its tree
    async fn store_tree(&self, tree: Tree) -> Result<(), RepositoryError>;

    async fn retrieve_tree(&self) -> Result<Arc<Tree>, RepositoryError>;

    /// Tree plus the file at `index`, guaranteed to come from one batch
    async fn snapshot(&self, index: u64) -> Result<Snapshot, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("the file is not found in the storage: index {0}")]
    NotFound(u64),
    #[error("no merkle tree has been stored")]
    NoTree,
    #[error("no upload batch is open")]
    NoBatch,
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }
}
