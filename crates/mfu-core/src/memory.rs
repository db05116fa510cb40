//! In-memory repository

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::repository::{NewFile, Repository, RepositoryError, Snapshot, StoredFile};
use crate::tree::Tree;

/// A published batch
#[derive(Debug, Default)]
struct Batch {
    seq: u64,
    files: Vec<StoredFile>,
    tree: Option<Arc<Tree>>,
}

impl Batch {
    fn file(&self, index: u64) -> Option<&StoredFile> {
        let slot = usize::try_from(index).ok()?.checked_sub(1)?;
        self.files.get(slot)
    }
}

/// Repository kept entirely in process memory.
///
/// The committed batch sits behind a read/write lock and is swapped as a whole
/// when a tree is stored; files written since the last `delete_all_files` wait
/// in a staging area until then.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    committed: RwLock<Arc<Batch>>,
    staging: Mutex<Option<Vec<StoredFile>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&self) -> Arc<Batch> {
        Arc::clone(&self.committed.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Sequence number of the committed batch (0 before the first upload)
    pub fn batch(&self) -> u64 {
        self.current().seq
    }

    /// Number of files in the committed batch
    pub fn file_count(&self) -> usize {
        self.current().files.len()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn delete_all_files(&self) -> Result<(), RepositoryError> {
        let mut staging = self.staging.lock().unwrap_or_else(PoisonError::into_inner);
        *staging = Some(Vec::new());
        Ok(())
    }

    async fn store_file(&self, file: NewFile) -> Result<u64, RepositoryError> {
        let mut staging = self.staging.lock().unwrap_or_else(PoisonError::into_inner);
        let files = staging.get_or_insert_with(Vec::new);
        let index = files.len() as u64 + 1;
        files.push(StoredFile {
            index,
            name: file.name,
            content: file.content,
        });
        Ok(index)
    }

    async fn retrieve_file_by_index(&self, index: u64) -> Result<StoredFile, RepositoryError> {
        self.current()
            .file(index)
            .cloned()
            .ok_or(RepositoryError::NotFound(index))
    }

    async fn store_tree(&self, tree: Tree) -> Result<(), RepositoryError> {
        let files = self
            .staging
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(RepositoryError::NoBatch)?;

        let mut committed = self.committed.write().unwrap_or_else(PoisonError::into_inner);
        let seq = committed.seq + 1;
        *committed = Arc::new(Batch {
            seq,
            files,
            tree: Some(Arc::new(tree)),
        });
        tracing::debug!("Published in-memory batch {}", seq);
        Ok(())
    }

    async fn retrieve_tree(&self) -> Result<Arc<Tree>, RepositoryError> {
        self.current().tree.clone().ok_or(RepositoryError::NoTree)
    }

    async fn snapshot(&self, index: u64) -> Result<Snapshot, RepositoryError> {
        let batch = self.current();
        let file = batch.file(index).cloned().ok_or(RepositoryError::NotFound(index))?;
        let tree = batch.tree.clone().ok_or(RepositoryError::NoTree)?;
        Ok(Snapshot {
            batch: batch.seq,
            tree,
            file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashAlgorithm;

    fn tree_of(blocks: &[&str]) -> Tree {
        Tree::build(blocks, &HashAlgorithm::Sha256).unwrap()
    }

    #[tokio::test]
    async fn test_files_invisible_until_tree_stored() {
        let repo = MemoryRepository::new();
        repo.delete_all_files().await.unwrap();
        assert_eq!(repo.store_file(NewFile::new("a.txt", "A")).await.unwrap(), 1);
        assert_eq!(repo.store_file(NewFile::new("b.txt", "B")).await.unwrap(), 2);

        assert!(repo.retrieve_file_by_index(1).await.unwrap_err().is_not_found());
        assert!(matches!(repo.retrieve_tree().await, Err(RepositoryError::NoTree)));

        repo.store_tree(tree_of(&["A", "B"])).await.unwrap();

        let file = repo.retrieve_file_by_index(2).await.unwrap();
        assert_eq!(file.name, "b.txt");
        assert_eq!(file.content.as_ref(), b"B");
        assert_eq!(repo.batch(), 1);
        assert_eq!(repo.file_count(), 2);
    }

    #[tokio::test]
    async fn test_new_batch_replaces_old() {
        let repo = MemoryRepository::new();
        repo.delete_all_files().await.unwrap();
        for name in ["1", "2", "3"] {
            repo.store_file(NewFile::new(name, name)).await.unwrap();
        }
        repo.store_tree(tree_of(&["1", "2", "3"])).await.unwrap();

        repo.delete_all_files().await.unwrap();
        assert_eq!(repo.store_file(NewFile::new("x", "X")).await.unwrap(), 1);
        repo.store_tree(tree_of(&["X"])).await.unwrap();

        assert_eq!(repo.retrieve_file_by_index(1).await.unwrap().name, "x");
        assert!(repo.retrieve_file_by_index(2).await.unwrap_err().is_not_found());
        assert_eq!(repo.batch(), 2);
    }

    #[tokio::test]
    async fn test_abandoned_batch_keeps_previous() {
        let repo = MemoryRepository::new();
        repo.delete_all_files().await.unwrap();
        repo.store_file(NewFile::new("a", "A")).await.unwrap();
        repo.store_tree(tree_of(&["A"])).await.unwrap();

        repo.delete_all_files().await.unwrap();
        repo.store_file(NewFile::new("b", "B")).await.unwrap();

        let snapshot = repo.snapshot(1).await.unwrap();
        assert_eq!(snapshot.batch, 1);
        assert_eq!(snapshot.file.name, "a");
        assert_eq!(snapshot.tree.root_hash(), tree_of(&["A"]).root_hash());
    }

    #[tokio::test]
    async fn test_store_tree_without_batch() {
        let repo = MemoryRepository::new();
        assert!(matches!(
            repo.store_tree(tree_of(&["A"])).await,
            Err(RepositoryError::NoBatch)
        ));
    }

    #[tokio::test]
    async fn test_index_zero_not_found() {
        let repo = MemoryRepository::new();
        repo.delete_all_files().await.unwrap();
        repo.store_file(NewFile::new("a", "A")).await.unwrap();
        repo.store_tree(tree_of(&["A"])).await.unwrap();
        assert!(repo.snapshot(0).await.unwrap_err().is_not_found());
    }
}
