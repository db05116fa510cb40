mod handlers;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use mfu_core::{HashFn, ProofService, Repository, UploadCoordinator};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::protocol::UPLOAD_PATH;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<UploadCoordinator>,
    pub proofs: Arc<ProofService>,
}

pub struct MfuServer {
    state: AppState,
    addr: String,
    max_upload_bytes: usize,
}

impl MfuServer {
    pub fn new(repository: Arc<dyn Repository>, hash: Arc<dyn HashFn>, addr: String) -> Self {
        Self {
            state: AppState {
                coordinator: Arc::new(UploadCoordinator::new(
                    Arc::clone(&repository),
                    Arc::clone(&hash),
                )),
                proofs: Arc::new(ProofService::new(repository, hash)),
            },
            addr,
            max_upload_bytes: 100 * 1024 * 1024, // 100 MB default
        }
    }

    /// Set maximum size of one upload request
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(UPLOAD_PATH, post(handlers::upload_files))
            .route("/download/:index", get(handlers::download_file))
            .route("/proof/:index", get(handlers::merkle_proof))
            .route("/health", get(handlers::health_check))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(DefaultBodyLimit::max(self.max_upload_bytes)),
            )
            .with_state(self.state.clone())
    }

    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.addr).await?;
        self.run_with_listener(listener).await
    }

    /// Serve on an already bound listener (port 0 in tests)
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<()> {
        tracing::info!("mfu server listening on {}", listener.local_addr()?);
        let app = self.router();
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;

        Ok(())
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use mfu_core::{HashAlgorithm, MemoryRepository, NewFile};
    use tower::ServiceExt;

    fn server() -> MfuServer {
        MfuServer::new(
            Arc::new(MemoryRepository::new()),
            Arc::new(HashAlgorithm::Sha256),
            "127.0.0.1:0".to_string(),
        )
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get(server().router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn test_non_numeric_index_is_bad_request() {
        let server = server();
        assert_eq!(get(server.router(), "/download/abc").await.0, StatusCode::BAD_REQUEST);
        assert_eq!(get(server.router(), "/proof/-1").await.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let server = server();
        assert_eq!(get(server.router(), "/download/1").await.0, StatusCode::NOT_FOUND);
        assert_eq!(get(server.router(), "/proof/1").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_download_and_proof_after_upload() {
        let server = server();
        server
            .state
            .coordinator
            .upload(vec![
                NewFile::new("a.txt", "A"),
                NewFile::new("b.txt", "B"),
                NewFile::new("c.txt", "C"),
            ])
            .await
            .unwrap();

        let (status, body) = get(server.router(), "/download/2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"B");

        let (status, body) = get(server.router(), "/proof/2").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let proof = json["merkleProof"].as_array().unwrap();
        assert_eq!(proof.len(), 2);
        assert_eq!(proof[0]["position"], "L");

        assert_eq!(get(server.router(), "/download/4").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_without_multipart_is_rejected() {
        let response = server()
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .body(Body::from("not multipart"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
