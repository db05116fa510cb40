use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use mfu_core::{NewFile, ProofError};
use std::fmt::Display;

use super::AppState;
use crate::protocol::{MerkleProofResponse, UploadedFilesResponse, FILES_FIELD};

/// Log `err` and answer with the bare status text
fn error_response(status: StatusCode, err: impl Display) -> Response {
    let reason = status.canonical_reason().unwrap_or("Error");
    if status.is_server_error() {
        tracing::error!("{}: {}", reason, err);
    } else {
        tracing::warn!("{}: {}", reason, err);
    }
    (status, reason).into_response()
}

fn parse_index(raw: &str) -> Result<u64, Response> {
    raw.parse::<u64>()
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("invalid index {:?}: {}", raw, e)))
}

fn proof_error_response(err: ProofError) -> Response {
    let status = match err {
        ProofError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err)
}

/// Keep a file name safe for a quoted header parameter
fn header_safe_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect()
}

pub async fn health_check() -> impl IntoResponse {
    "ok"
}

pub async fn upload_files(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut files = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(e.status(), e),
        };

        if field.name() != Some(FILES_FIELD) {
            continue;
        }

        let name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("file-{}", files.len() + 1));
        match field.bytes().await {
            Ok(content) => files.push(NewFile::new(name, content)),
            Err(e) => return error_response(e.status(), e),
        }
    }

    if files.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "no files in upload");
    }

    match state.coordinator.upload(files).await {
        Ok(receipt) => Json(UploadedFilesResponse {
            uploaded_files: receipt.files,
        })
        .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

pub async fn download_file(State(state): State<AppState>, Path(index): Path<String>) -> Response {
    let index = match parse_index(&index) {
        Ok(index) => index,
        Err(response) => return response,
    };

    match state.proofs.file_at(index).await {
        Ok(file) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", header_safe_name(&file.name)),
                ),
            ],
            file.content,
        )
            .into_response(),
        Err(e) => proof_error_response(e),
    }
}

pub async fn merkle_proof(State(state): State<AppState>, Path(index): Path<String>) -> Response {
    let index = match parse_index(&index) {
        Ok(index) => index,
        Err(response) => return response,
    };

    match state.proofs.proof_for_index(index).await {
        Ok(proof) => Json(MerkleProofResponse { merkle_proof: proof }).into_response(),
        Err(e) => proof_error_response(e),
    }
}
