pub mod client;
pub mod protocol;
pub mod server;
pub mod storage;

pub use client::{ClientError, HttpDownloader, HttpUploader, RootMarker};
pub use protocol::{MerkleProofResponse, UploadedFilesResponse};
pub use server::{AppState, MfuServer};
pub use storage::open_repository;
