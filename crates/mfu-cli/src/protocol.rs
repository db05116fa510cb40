//! Wire types shared by the HTTP server and client

use mfu_core::{ProofElement, UploadedFile};
use serde::{Deserialize, Serialize};

/// Multipart field carrying the uploaded files
pub const FILES_FIELD: &str = "files";

pub const UPLOAD_PATH: &str = "/upload";

/// Body of a successful `POST /upload`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFilesResponse {
    #[serde(rename = "uploadedFiles")]
    pub uploaded_files: Vec<UploadedFile>,
}

/// Body of a successful `GET /proof/{index}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProofResponse {
    #[serde(rename = "merkleProof")]
    pub merkle_proof: Vec<ProofElement>,
}

pub fn download_path(index: u64) -> String {
    format!("/download/{}", index)
}

pub fn proof_path(index: u64) -> String {
    format!("/proof/{}", index)
}
