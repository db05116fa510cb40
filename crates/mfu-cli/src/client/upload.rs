use mfu_core::{root_of, Digest, HashFn, NewFile, UploadedFile};
use reqwest::multipart::{Form, Part};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{base_url, check_status, http_client, ClientError, TransferError};
use crate::protocol::{UploadedFilesResponse, FILES_FIELD, UPLOAD_PATH};

/// Files the server accepted plus the root computed locally over them
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub files: Vec<UploadedFile>,
    pub root: Digest,
}

/// Sends a batch to `POST /upload`.
pub struct HttpUploader {
    client: reqwest::Client,
    base_url: String,
    hash: Arc<dyn HashFn>,
}

impl HttpUploader {
    pub fn new(server_url: &str, timeout: Duration, hash: Arc<dyn HashFn>) -> Result<Self, ClientError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url(server_url),
            hash,
        })
    }

    /// Upload `files` as one batch. The returned root is computed here from the
    /// bytes sent, never taken from the server.
    pub async fn upload(&self, files: Vec<NewFile>) -> Result<UploadOutcome, ClientError> {
        let contents: Vec<_> = files.iter().map(|f| f.content.clone()).collect();
        let root = root_of(&contents, self.hash.as_ref())?;

        let count = files.len();
        let form = files.into_iter().fold(Form::new(), |form, file| {
            form.part(
                FILES_FIELD,
                Part::bytes(file.content.to_vec()).file_name(file.name),
            )
        });

        debug!("Uploading {} files to {}", count, self.base_url);
        let response = self.send(form).await.map_err(ClientError::Upload)?;

        if response.uploaded_files.len() != count {
            warn!(
                "Server acknowledged {} files, {} were sent",
                response.uploaded_files.len(),
                count
            );
        }

        Ok(UploadOutcome {
            files: response.uploaded_files,
            root,
        })
    }

    async fn send(&self, form: Form) -> Result<UploadedFilesResponse, TransferError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, UPLOAD_PATH))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}
