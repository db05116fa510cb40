//! Repository selection from configuration

use anyhow::Result;
use mfu_config::{StorageBackend, StorageConfig};
use mfu_core::{MemoryRepository, Repository};
use std::sync::Arc;

/// Open the repository backend named in the storage config.
pub async fn open_repository(config: &StorageConfig) -> Result<Arc<dyn Repository>> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory repository");
            Ok(Arc::new(MemoryRepository::new()))
        }
        StorageBackend::S3 => open_s3(config).await,
    }
}

#[cfg(feature = "s3")]
async fn open_s3(config: &StorageConfig) -> Result<Arc<dyn Repository>> {
    use anyhow::Context;

    let s3 = config
        .s3
        .as_ref()
        .context("storage backend is s3 but [storage.s3] is not configured")?;
    let repo = mfu_s3::S3Repository::new(mfu_s3::S3Config {
        bucket: s3.bucket.clone(),
        prefix: s3.prefix.clone(),
        region: Some(s3.region.clone()),
        endpoint: s3.endpoint.clone(),
        access_key_id: s3.access_key_id.clone(),
        secret_access_key: s3.secret_access_key.clone(),
    })
    .await
    .context("Failed to initialize S3 repository")?;
    Ok(Arc::new(repo))
}

#[cfg(not(feature = "s3"))]
async fn open_s3(_config: &StorageConfig) -> Result<Arc<dyn Repository>> {
    anyhow::bail!("S3 storage requires the s3 feature")
}
