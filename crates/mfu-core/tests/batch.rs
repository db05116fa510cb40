use async_trait::async_trait;
use mfu_core::{
    root_of, verify, HashAlgorithm, HashFn, MemoryRepository, NewFile, ProofError, ProofService,
    Repository, RepositoryError, Snapshot, StoredFile, Tree, TreeError, UploadCoordinator,
    UploadError,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn hash() -> Arc<dyn HashFn> {
    Arc::new(HashAlgorithm::Sha256)
}

fn batch(names: &[&str]) -> Vec<NewFile> {
    names
        .iter()
        .map(|name| NewFile::new(format!("{}.txt", name), format!("contents of {}", name)))
        .collect()
}

#[tokio::test]
async fn upload_assigns_indices_and_returns_root() {
    let repo = Arc::new(MemoryRepository::new());
    let coordinator = UploadCoordinator::new(repo.clone(), hash());

    let files = batch(&["a", "b", "c"]);
    let contents: Vec<_> = files.iter().map(|f| f.content.clone()).collect();
    let receipt = coordinator.upload(files).await.unwrap();

    let indices: Vec<u64> = receipt.files.iter().map(|f| f.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert_eq!(receipt.files[1].name, "b.txt");
    assert_eq!(receipt.root, root_of(&contents, &HashAlgorithm::Sha256).unwrap());
    assert_eq!(repo.retrieve_tree().await.unwrap().root_hash(), &receipt.root);
}

#[tokio::test]
async fn second_upload_replaces_first() {
    let repo = Arc::new(MemoryRepository::new());
    let coordinator = UploadCoordinator::new(repo.clone(), hash());

    coordinator.upload(batch(&["a", "b", "c", "d"])).await.unwrap();
    let receipt = coordinator.upload(batch(&["x", "y"])).await.unwrap();

    assert_eq!(receipt.files.iter().map(|f| f.index).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(repo.retrieve_file_by_index(1).await.unwrap().name, "x.txt");
    assert!(repo.retrieve_file_by_index(3).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn empty_upload_is_rejected_without_touching_storage() {
    let repo = Arc::new(MemoryRepository::new());
    let coordinator = UploadCoordinator::new(repo.clone(), hash());
    coordinator.upload(batch(&["a"])).await.unwrap();

    let err = coordinator.upload(Vec::new()).await.unwrap_err();
    assert!(matches!(err, UploadError::Tree(TreeError::EmptyInput)));
    assert_eq!(repo.retrieve_file_by_index(1).await.unwrap().name, "a.txt");
}

#[tokio::test]
async fn proof_service_proofs_verify_against_upload_root() {
    let repo = Arc::new(MemoryRepository::new());
    let coordinator = UploadCoordinator::new(repo.clone(), hash());
    let service = ProofService::new(repo.clone(), hash());

    let receipt = coordinator
        .upload(batch(&["a", "b", "c", "d", "e"]))
        .await
        .unwrap();

    for uploaded in &receipt.files {
        let proof = service.proof_for_index(uploaded.index).await.unwrap();
        let file = service.file_at(uploaded.index).await.unwrap();
        assert_eq!(file.name, uploaded.name);
        assert!(verify(&receipt.root, &file.content, &proof, &HashAlgorithm::Sha256));
    }

    assert!(matches!(
        service.proof_for_index(6).await,
        Err(ProofError::NotFound(6))
    ));
    assert!(matches!(service.file_at(0).await, Err(ProofError::NotFound(0))));
}

/// Wraps a memory repository and fails `store_tree` while the switch is on.
struct FlakyRepository {
    inner: MemoryRepository,
    fail_tree: AtomicBool,
}

#[async_trait]
impl Repository for FlakyRepository {
    async fn delete_all_files(&self) -> Result<(), RepositoryError> {
        self.inner.delete_all_files().await
    }

    async fn store_file(&self, file: NewFile) -> Result<u64, RepositoryError> {
        self.inner.store_file(file).await
    }

    async fn retrieve_file_by_index(&self, index: u64) -> Result<StoredFile, RepositoryError> {
        self.inner.retrieve_file_by_index(index).await
    }

    async fn store_tree(&self, tree: Tree) -> Result<(), RepositoryError> {
        if self.fail_tree.load(Ordering::SeqCst) {
            return Err(RepositoryError::Backend("disk full".into()));
        }
        self.inner.store_tree(tree).await
    }

    async fn retrieve_tree(&self) -> Result<Arc<Tree>, RepositoryError> {
        self.inner.retrieve_tree().await
    }

    async fn snapshot(&self, index: u64) -> Result<Snapshot, RepositoryError> {
        self.inner.snapshot(index).await
    }
}

#[tokio::test]
async fn failed_tree_store_aborts_batch() {
    let repo = Arc::new(FlakyRepository {
        inner: MemoryRepository::new(),
        fail_tree: AtomicBool::new(false),
    });
    let coordinator = UploadCoordinator::new(repo.clone(), hash());
    let first = coordinator.upload(batch(&["a", "b"])).await.unwrap();

    repo.fail_tree.store(true, Ordering::SeqCst);
    let err = coordinator.upload(batch(&["x", "y", "z"])).await.unwrap_err();
    assert!(matches!(err, UploadError::StoreTree(RepositoryError::Backend(_))));
    assert_eq!(err.to_string(), "while storing tree: storage backend error: disk full");

    let snapshot = repo.snapshot(2).await.unwrap();
    assert_eq!(snapshot.file.name, "b.txt");
    assert_eq!(snapshot.tree.root_hash(), &first.root);
    assert!(repo.snapshot(3).await.unwrap_err().is_not_found());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn proofs_during_uploads_always_match_one_batch() {
    let repo = Arc::new(MemoryRepository::new());
    let coordinator = Arc::new(UploadCoordinator::new(repo.clone(), hash()));
    let service = Arc::new(ProofService::new(repo.clone(), hash()));

    let generations: Vec<Vec<NewFile>> = (0..20)
        .map(|g| {
            (0..3)
                .map(|i| NewFile::new(format!("{}-{}", g, i), format!("generation {} file {}", g, i)))
                .collect()
        })
        .collect();
    let roots: HashSet<_> = generations
        .iter()
        .map(|files| {
            let contents: Vec<_> = files.iter().map(|f| f.content.clone()).collect();
            root_of(&contents, &HashAlgorithm::Sha256).unwrap()
        })
        .collect();

    coordinator.upload(generations[0].clone()).await.unwrap();

    let uploader = {
        let coordinator = Arc::clone(&coordinator);
        let generations = generations.clone();
        tokio::spawn(async move {
            for files in generations.into_iter().skip(1) {
                coordinator.upload(files).await.unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let repo = Arc::clone(&repo);
            let service = Arc::clone(&service);
            let roots = roots.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    let snapshot = repo.snapshot(2).await.unwrap();
                    let proof = snapshot
                        .tree
                        .find_proof(&snapshot.file.content, &HashAlgorithm::Sha256)
                        .expect("file belongs to its snapshot tree");
                    assert!(roots.contains(snapshot.tree.root_hash()));
                    assert!(verify(
                        snapshot.tree.root_hash(),
                        &snapshot.file.content,
                        &proof,
                        &HashAlgorithm::Sha256
                    ));
                    service.proof_for_index(3).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    uploader.await.unwrap();
    for reader in futures::future::join_all(readers).await {
        reader.unwrap();
    }
}
