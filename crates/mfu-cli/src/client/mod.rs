//! HTTP client side: upload a batch, download and verify single files

mod download;
mod files;
mod marker;
mod upload;

pub use download::{DownloadedFile, HttpDownloader};
pub use files::{collect_files, read_files};
pub use marker::RootMarker;
pub use upload::{HttpUploader, UploadOutcome};

use mfu_core::{DigestParseError, TreeError};
use std::path::PathBuf;
use std::time::Duration;

/// Client-side errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to upload files: {0}")]
    Upload(#[source] TransferError),
    #[error("failed to download file: {0}")]
    Download(#[source] TransferError),
    #[error("file not found at index {0}")]
    NotFound(u64),
    #[error("merkle proof verification failed for file {index}")]
    Verification { index: u64 },
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },
    #[error("root marker {path}: {source}")]
    RootMarker {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid root in {path}: {source}")]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: DigestParseError,
    },
    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
}

/// What went wrong talking to the server
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("server answered {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ClientError::Build)
}

/// Turn a non-success response into [`TransferError::Status`]
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, TransferError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransferError::Status {
        status,
        body: body.trim().to_string(),
    })
}

pub(crate) fn base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
