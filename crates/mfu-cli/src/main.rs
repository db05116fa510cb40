//! mfu - verifiable file upload and download
//!
//! Usage:
//!   mfu server [--addr 127.0.0.1:8080] [--port 8080]
//!   mfu client [--server-url <url>] [--root-file <path>] upload <path>... [--no-ignore]
//!   mfu client [--server-url <url>] [--root-file <path>] download <index> [-o output]

mod app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
