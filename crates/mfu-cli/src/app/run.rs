use anyhow::{Context, Result};
use clap::Parser;
use mfu_cli::client::{collect_files, read_files};
use mfu_cli::{open_repository, HttpDownloader, HttpUploader, MfuServer, RootMarker};
use mfu_config::{with_port, Config};
use mfu_core::HashFn;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use super::args::{Cli, ClientCommands, Commands};
use super::util::format_size;

pub(crate) async fn run() -> Result<()> {
    // Logs go to stderr; stdout carries downloaded file bytes
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load_or_default();
    config.apply_env_overrides();
    if let Some(hash) = cli.hash {
        config.merkle.hash = hash;
    }
    let hash: Arc<dyn HashFn> = Arc::new(config.merkle.hash);

    match cli.command {
        Commands::Server { addr, port } => {
            let mut bind_address = addr.unwrap_or_else(|| config.server.bind_address.clone());
            if let Some(port) = port {
                bind_address = with_port(&bind_address, port);
            }

            let repository = open_repository(&config.storage).await?;
            tracing::info!(
                "Starting mfu server on {} ({} hashing, {:?} storage)",
                bind_address,
                config.merkle.hash.as_str(),
                config.storage.backend
            );

            MfuServer::new(repository, hash, bind_address)
                .with_max_upload_bytes(config.server.max_upload_bytes())
                .run()
                .await
                .context("Server failed")
        }
        Commands::Client {
            server_url,
            root_file,
            timeout,
            command,
        } => {
            let server_url = server_url.unwrap_or_else(|| config.client.server_url.clone());
            let marker = RootMarker::new(
                root_file.unwrap_or_else(|| PathBuf::from(&config.client.root_file)),
            );
            let timeout = Duration::from_secs(timeout.unwrap_or(config.client.timeout_secs));

            match command {
                ClientCommands::Upload { paths, no_ignore } => {
                    let files = collect_files(&paths, !no_ignore)?;
                    if files.is_empty() {
                        anyhow::bail!("No files to upload");
                    }
                    let files = read_files(&files).await?;
                    let total: u64 = files.iter().map(|f| f.content.len() as u64).sum();

                    let uploader = HttpUploader::new(&server_url, timeout, hash)?;
                    let outcome = uploader.upload(files).await?;
                    marker
                        .write(&outcome.root)
                        .context("Failed to pin merkle root")?;

                    for file in &outcome.files {
                        println!("{}\t{}", file.index, file.name);
                    }
                    println!(
                        "Uploaded {} files ({}), root {} pinned in {}",
                        outcome.files.len(),
                        format_size(total),
                        outcome.root,
                        marker.path().display()
                    );
                    Ok(())
                }
                ClientCommands::Download { index, output } => {
                    let root = marker
                        .read()
                        .context("No pinned merkle root (run `mfu client upload` first)")?;

                    let downloader = HttpDownloader::new(&server_url, timeout, hash)?;
                    let file = downloader.download(index, &root).await?;

                    if let Some(path) = output {
                        std::fs::write(&path, &file.content)
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        eprintln!(
                            "Verified file {} ({}) -> {}",
                            index,
                            format_size(file.content.len() as u64),
                            path.display()
                        );
                    } else {
                        let mut stdout = std::io::stdout().lock();
                        stdout.write_all(&file.content)?;
                        stdout.flush()?;
                    }
                    Ok(())
                }
            }
        }
    }
}
