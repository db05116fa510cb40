//! S3-backed repository for mfu upload batches.
//!
//! Every batch lives under its own key prefix and is published by overwriting a
//! single pointer object, so readers never see half of one batch and half of
//! another:
//!
//! ```text
//! {prefix}CURRENT                              -> "42"
//! {prefix}batch-00000000000000000042/manifest.json  (file names + merkle tree)
//! {prefix}batch-00000000000000000042/files/0000000001
//! {prefix}batch-00000000000000000042/files/0000000002
//! ```
//!
//! Objects of the replaced batch are purged after the pointer moves.
//!
//! # Example
//!
//! ```ignore
//! use mfu_s3::{S3Config, S3Repository};
//!
//! let config = S3Config {
//!     bucket: "mfu-files".to_string(),
//!     prefix: Some("uploads/".to_string()),
//!     region: None, // Uses AWS_REGION env var
//!     endpoint: Some("http://localhost:4566".to_string()),
//!     access_key_id: None,
//!     secret_access_key: None,
//! };
//!
//! let repo = S3Repository::new(config).await?;
//! ```

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use mfu_core::{NewFile, Repository, RepositoryError, Snapshot, StoredFile, Tree};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// How often `snapshot` re-reads the pointer when a batch is swapped under it
const SNAPSHOT_ATTEMPTS: usize = 3;

/// S3 configuration
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,
    /// Optional prefix for all keys (e.g., "uploads/")
    pub prefix: Option<String>,
    /// AWS region (defaults to AWS_REGION env var)
    pub region: Option<String>,
    /// Custom endpoint URL (for S3-compatible services like LocalStack, MinIO, R2)
    pub endpoint: Option<String>,
    /// Static credentials; the default AWS provider chain is used when unset
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

/// Object written last for every batch
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    seq: u64,
    names: Vec<String>,
    tree: Tree,
}

impl Manifest {
    fn name_of(&self, index: u64) -> Option<&str> {
        let slot = usize::try_from(index).ok()?.checked_sub(1)?;
        self.names.get(slot).map(String::as_str)
    }
}

/// Batch being written
#[derive(Debug)]
struct Staging {
    seq: u64,
    replaces: Option<u64>,
    names: Vec<String>,
}

/// Object key layout below the configured prefix
#[derive(Debug, Clone)]
struct Keys {
    prefix: String,
}

impl Keys {
    fn pointer(&self) -> String {
        format!("{}CURRENT", self.prefix)
    }

    fn batch(&self, seq: u64) -> String {
        format!("{}batch-{:020}/", self.prefix, seq)
    }

    fn manifest(&self, seq: u64) -> String {
        format!("{}manifest.json", self.batch(seq))
    }

    fn file(&self, seq: u64, index: u64) -> String {
        format!("{}files/{:010}", self.batch(seq), index)
    }
}

/// Repository storing each batch as S3 objects.
pub struct S3Repository {
    client: S3Client,
    bucket: String,
    keys: Keys,
    staging: Mutex<Option<Staging>>,
    /// Last manifest read or written, keyed by its seq
    manifest_cache: RwLock<Option<Arc<Manifest>>>,
}

impl S3Repository {
    /// Connect to S3 using the AWS environment plus the given overrides.
    pub async fn new(config: S3Config) -> Result<Self, S3RepositoryError> {
        if config.bucket.trim().is_empty() {
            return Err(S3RepositoryError::Config("bucket name is empty".into()));
        }

        let mut aws_config_loader = aws_config::from_env();

        if let Some(ref region) = config.region {
            aws_config_loader = aws_config_loader.region(Region::new(region.clone()));
        }

        match (&config.access_key_id, &config.secret_access_key) {
            (Some(key), Some(secret)) => {
                let credentials = Credentials::new(key, secret, None, None, "mfu-config");
                aws_config_loader = aws_config_loader.credentials_provider(credentials);
            }
            (None, None) => {}
            _ => {
                return Err(S3RepositoryError::Config(
                    "access key id and secret access key must be set together".into(),
                ))
            }
        }

        let aws_config = aws_config_loader.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);

        if let Some(ref endpoint) = config.endpoint {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());
        let prefix = config.prefix.unwrap_or_default();

        info!(
            "S3Repository initialized with bucket: {}, prefix: {}",
            config.bucket, prefix
        );

        Ok(Self {
            client,
            bucket: config.bucket,
            keys: Keys { prefix },
            staging: Mutex::new(None),
            manifest_cache: RwLock::new(None),
        })
    }

    async fn get_object(&self, key: &str) -> Result<Option<Bytes>, S3RepositoryError> {
        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => {
                let data = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| S3RepositoryError::S3(format!("Failed to read body: {}", e)))?;
                Ok(Some(data.into_bytes()))
            }
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    Ok(None)
                } else {
                    Err(S3RepositoryError::S3(format!("S3 get {} failed: {}", key, service_err)))
                }
            }
        }
    }

    async fn put_object(&self, key: &str, data: Vec<u8>) -> Result<(), S3RepositoryError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                S3RepositoryError::S3(format!("S3 put {} failed: {}", key, e.into_service_error()))
            })?;
        Ok(())
    }

    /// Delete every object below `prefix`
    async fn purge(&self, prefix: &str) -> Result<usize, S3RepositoryError> {
        let mut deleted = 0;
        let mut continuation: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| {
                    S3RepositoryError::S3(format!("S3 list {} failed: {}", prefix, e.into_service_error()))
                })?;

            for object in output.contents() {
                let Some(key) = object.key() else { continue };
                self.client
                    .delete_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|e| {
                        S3RepositoryError::S3(format!("S3 delete {} failed: {}", key, e.into_service_error()))
                    })?;
                deleted += 1;
            }

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(deleted)
    }

    /// Seq of the published batch, if any
    async fn current_seq(&self) -> Result<Option<u64>, S3RepositoryError> {
        match self.get_object(&self.keys.pointer()).await? {
            Some(data) => parse_pointer(&data).map(Some),
            None => Ok(None),
        }
    }

    async fn manifest(&self, seq: u64) -> Result<Option<Arc<Manifest>>, S3RepositoryError> {
        if let Some(cached) = self
            .manifest_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|m| m.seq == seq)
        {
            return Ok(Some(Arc::clone(cached)));
        }

        let Some(data) = self.get_object(&self.keys.manifest(seq)).await? else {
            return Ok(None);
        };
        let manifest: Manifest = serde_json::from_slice(&data)?;
        if manifest.seq != seq {
            return Err(S3RepositoryError::Corrupt(format!(
                "manifest of batch {} claims batch {}",
                seq, manifest.seq
            )));
        }

        let manifest = Arc::new(manifest);
        *self
            .manifest_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&manifest));
        Ok(Some(manifest))
    }

    /// One attempt at reading a consistent (tree, file) pair.
    /// `Ok(None)` means the batch changed while reading and the caller should retry.
    async fn try_snapshot(&self, index: u64) -> Result<Option<Snapshot>, RepositoryError> {
        let seq = self.current_seq().await?.ok_or(RepositoryError::NotFound(index))?;
        let Some(manifest) = self.manifest(seq).await? else {
            return Ok(None);
        };
        let name = manifest
            .name_of(index)
            .ok_or(RepositoryError::NotFound(index))?
            .to_string();
        let Some(content) = self.get_object(&self.keys.file(seq, index)).await? else {
            return Ok(None);
        };

        Ok(Some(Snapshot {
            batch: seq,
            tree: Arc::new(manifest.tree.clone()),
            file: StoredFile {
                index,
                name,
                content,
            },
        }))
    }
}

fn parse_pointer(data: &[u8]) -> Result<u64, S3RepositoryError> {
    let text = std::str::from_utf8(data)
        .map_err(|_| S3RepositoryError::Corrupt("batch pointer is not utf-8".into()))?;
    text.trim()
        .parse()
        .map_err(|_| S3RepositoryError::Corrupt(format!("batch pointer is not a number: {:?}", text)))
}

#[async_trait]
impl Repository for S3Repository {
    async fn delete_all_files(&self) -> Result<(), RepositoryError> {
        let replaces = self.current_seq().await?;
        let seq = replaces.map_or(1, |s| s + 1);

        // Leftovers of an abandoned attempt at the same seq
        let leftovers = self
            .purge(&self.keys.batch(seq))
            .await
            .map_err(RepositoryError::from)?;
        if leftovers > 0 {
            debug!("Purged {} leftover objects of batch {}", leftovers, seq);
        }

        *self.staging.lock().unwrap_or_else(PoisonError::into_inner) = Some(Staging {
            seq,
            replaces,
            names: Vec::new(),
        });
        Ok(())
    }

    async fn store_file(&self, file: NewFile) -> Result<u64, RepositoryError> {
        let (seq, index) = {
            let mut staging = self.staging.lock().unwrap_or_else(PoisonError::into_inner);
            let staging = staging.as_mut().ok_or(RepositoryError::NoBatch)?;
            staging.names.push(file.name.clone());
            (staging.seq, staging.names.len() as u64)
        };

        let key = self.keys.file(seq, index);
        debug!("S3 storing {} ({} bytes) as {}", file.name, file.content.len(), key);
        self.put_object(&key, file.content.to_vec()).await?;
        Ok(index)
    }

    async fn retrieve_file_by_index(&self, index: u64) -> Result<StoredFile, RepositoryError> {
        Ok(self.snapshot(index).await?.file)
    }

    async fn store_tree(&self, tree: Tree) -> Result<(), RepositoryError> {
        let staging = self
            .staging
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(RepositoryError::NoBatch)?;

        let manifest = Manifest {
            seq: staging.seq,
            names: staging.names,
            tree,
        };
        let body = serde_json::to_vec(&manifest).map_err(S3RepositoryError::from)?;
        self.put_object(&self.keys.manifest(manifest.seq), body).await?;
        self.put_object(&self.keys.pointer(), manifest.seq.to_string().into_bytes())
            .await?;

        info!(
            "Published batch {} ({} files, root {})",
            manifest.seq,
            manifest.names.len(),
            manifest.tree.root_hash().short()
        );
        *self
            .manifest_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(manifest));

        if let Some(old) = staging.replaces {
            if let Err(e) = self.purge(&self.keys.batch(old)).await {
                warn!("Failed to purge replaced batch {}: {}", old, e);
            }
        }
        Ok(())
    }

    async fn retrieve_tree(&self) -> Result<Arc<Tree>, RepositoryError> {
        let seq = self.current_seq().await?.ok_or(RepositoryError::NoTree)?;
        let manifest = self.manifest(seq).await?.ok_or(RepositoryError::NoTree)?;
        Ok(Arc::new(manifest.tree.clone()))
    }

    async fn snapshot(&self, index: u64) -> Result<Snapshot, RepositoryError> {
        if index == 0 {
            return Err(RepositoryError::NotFound(index));
        }
        for attempt in 1..=SNAPSHOT_ATTEMPTS {
            if let Some(snapshot) = self.try_snapshot(index).await? {
                return Ok(snapshot);
            }
            debug!("Batch changed while reading index {} (attempt {})", index, attempt);
        }
        Err(S3RepositoryError::S3(format!(
            "batch kept changing while reading index {}",
            index
        ))
        .into())
    }
}

/// S3 repository specific errors
#[derive(Debug, thiserror::Error)]
pub enum S3RepositoryError {
    #[error("S3 error: {0}")]
    S3(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Corrupt batch: {0}")]
    Corrupt(String),
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl From<S3RepositoryError> for RepositoryError {
    fn from(e: S3RepositoryError) -> Self {
        RepositoryError::Backend(e.to_string())
    }
}
