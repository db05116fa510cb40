use clap::{Parser, Subcommand};
use mfu_core::HashAlgorithm;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mfu")]
#[command(version)]
#[command(about = "Verifiable file upload and download", long_about = None)]
pub(crate) struct Cli {
    /// Hash function for the merkle tree: sha256 (default) or sha512_256
    #[arg(long, global = true, env = "MFU_HASH")]
    pub(crate) hash: Option<HashAlgorithm>,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the HTTP server
    Server {
        /// Bind address (default from config: 127.0.0.1:8080)
        #[arg(long)]
        addr: Option<String>,
        /// Override only the port of the bind address
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },

    /// Upload to or download from a running server
    Client {
        /// Server base URL (default: http://localhost:8080)
        #[arg(long, env = "SERVER_URL")]
        server_url: Option<String>,
        /// File holding the pinned merkle root (default: .merkleroot)
        #[arg(long, env = "MERKLE_ROOT_FILENAME")]
        root_file: Option<PathBuf>,
        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        #[command(subcommand)]
        command: ClientCommands,
    },
}

#[derive(Subcommand)]
pub(crate) enum ClientCommands {
    /// Upload files, or the files of a directory, as a new batch and pin its root
    Upload {
        /// Files or directories, uploaded in the given order
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Include files ignored by .gitignore (default: respect .gitignore)
        #[arg(long)]
        no_ignore: bool,
    },

    /// Download a file by index and verify it against the pinned root
    Download {
        /// 1-based index reported by upload
        index: u64,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
