use bytes::Bytes;
use mfu_core::{verify, Digest, HashFn, ProofElement};
use reqwest::{header, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{base_url, check_status, http_client, ClientError, TransferError};
use crate::protocol::{download_path, proof_path, MerkleProofResponse};

/// A file whose proof checked out against the pinned root
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub index: u64,
    /// Name from the server's Content-Disposition, if any
    pub name: Option<String>,
    pub content: Bytes,
}

/// Fetches a file and its proof, releasing the bytes only once verified.
pub struct HttpDownloader {
    client: reqwest::Client,
    base_url: String,
    hash: Arc<dyn HashFn>,
}

impl HttpDownloader {
    pub fn new(server_url: &str, timeout: Duration, hash: Arc<dyn HashFn>) -> Result<Self, ClientError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url(server_url),
            hash,
        })
    }

    pub async fn download(&self, index: u64, root: &Digest) -> Result<DownloadedFile, ClientError> {
        let (name, content) = self.fetch_file(index).await?;
        let proof = self.fetch_proof(index).await?;

        if !verify(root, &content, &proof, self.hash.as_ref()) {
            return Err(ClientError::Verification { index });
        }
        debug!("File {} verified with {} proof elements", index, proof.len());

        Ok(DownloadedFile {
            index,
            name,
            content,
        })
    }

    /// Raw `GET /proof/{index}`
    pub async fn fetch_proof(&self, index: u64) -> Result<Vec<ProofElement>, ClientError> {
        let response = self.get(index, &proof_path(index)).await?;
        let body: MerkleProofResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Download(e.into()))?;
        Ok(body.merkle_proof)
    }

    async fn fetch_file(&self, index: u64) -> Result<(Option<String>, Bytes), ClientError> {
        let response = self.get(index, &download_path(index)).await?;
        let name = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_filename);
        let content = response
            .bytes()
            .await
            .map_err(|e| ClientError::Download(e.into()))?;
        Ok((name, content))
    }

    async fn get(&self, index: u64, path: &str) -> Result<reqwest::Response, ClientError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .map_err(|e| ClientError::Download(TransferError::Http(e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(index));
        }
        check_status(response).await.map_err(ClientError::Download)
    }
}

/// `attachment; filename="x.txt"` -> `x.txt`
fn disposition_filename(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_filename() {
        assert_eq!(
            disposition_filename("attachment; filename=\"a.txt\"").as_deref(),
            Some("a.txt")
        );
        assert_eq!(disposition_filename("attachment; filename=b.bin").as_deref(), Some("b.bin"));
        assert_eq!(disposition_filename("attachment"), None);
        assert_eq!(disposition_filename("attachment; filename=\"\""), None);
    }
}
