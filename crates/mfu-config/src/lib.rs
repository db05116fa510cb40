//! Shared configuration for mfu tools
//!
//! Reads from ~/.mfu/config.toml, then applies environment overrides.

use anyhow::{Context, Result};
use mfu_core::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Default server address for clients
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

/// Default file holding the pinned merkle root
pub const DEFAULT_ROOT_FILENAME: &str = ".merkleroot";

/// Top-level config structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub merkle: MerkleConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Max size of one upload request in MB
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_upload_mb() -> u64 {
    100
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }
}

/// Repository backend type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory (default) - lost on restart
    #[default]
    Memory,
    /// S3-compatible object store - requires s3 feature
    S3,
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Repository backend: "memory" (default) or "s3"
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub s3: Option<S3Config>,
}

/// S3-compatible storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub prefix: Option<String>,
    /// Static credentials; the AWS default chain is used when unset
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl S3Config {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            endpoint: None,
            region: default_region(),
            prefix: None,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Where the pinned root hash is kept between upload and download
    #[serde(default = "default_root_file")]
    pub root_file: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            root_file: default_root_file(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_root_file() -> String {
    DEFAULT_ROOT_FILENAME.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Merkle tree settings; client and server must agree on them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MerkleConfig {
    #[serde(default)]
    pub hash: HashAlgorithm,
}

impl Config {
    /// Load config from file, or create default if doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = get_config_path();

        if config_path.exists() {
            let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Load config, returning default on any error (no panic)
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Using default config: {:#}", e);
            Config::default()
        })
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)?;

        Ok(())
    }

    /// Apply the environment variables the mfu tools have always honoured:
    /// `PORT`, `SERVER_URL`, `MERKLE_ROOT_FILENAME`, `MFU_HASH` and the
    /// `AWS_*` S3 settings (setting `AWS_S3_BUCKET_NAME` selects the S3 backend).
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = env_value("PORT").and_then(|p| p.parse::<u16>().ok()) {
            if port != 0 {
                self.server.bind_address = with_port(&self.server.bind_address, port);
            }
        }
        if let Some(url) = env_value("SERVER_URL") {
            self.client.server_url = url;
        }
        if let Some(root_file) = env_value("MERKLE_ROOT_FILENAME") {
            self.client.root_file = root_file;
        }
        if let Some(hash) = env_value("MFU_HASH") {
            match hash.parse() {
                Ok(algorithm) => self.merkle.hash = algorithm,
                Err(e) => tracing::warn!("Ignoring MFU_HASH: {}", e),
            }
        }

        if let Some(bucket) = env_value("AWS_S3_BUCKET_NAME") {
            self.storage.backend = StorageBackend::S3;
            let s3 = self.storage.s3.get_or_insert_with(|| S3Config::new(bucket.clone()));
            s3.bucket = bucket;
        }
        if let Some(s3) = self.storage.s3.as_mut() {
            if let Some(endpoint) = env_value("AWS_ENDPOINT") {
                s3.endpoint = Some(endpoint);
            }
            if let Some(region) = env_value("AWS_REGION") {
                s3.region = region;
            }
            if let Some(key) = env_value("AWS_ACCESS_KEY_ID") {
                s3.access_key_id = Some(key);
            }
            if let Some(secret) = env_value("AWS_SECRET_ACCESS_KEY") {
                s3.secret_access_key = Some(secret);
            }
        }
    }
}

/// Get the mfu directory (~/.mfu)
pub fn get_mfu_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MFU_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mfu")
}

/// Get the config file path (~/.mfu/config.toml)
pub fn get_config_path() -> PathBuf {
    get_mfu_dir().join("config.toml")
}

fn env_value(var: &str) -> Option<String> {
    let value = std::env::var(var).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Replace the port of a `host:port` bind address
pub fn with_port(bind_address: &str, port: u16) -> String {
    if let Ok(mut sock) = bind_address.parse::<std::net::SocketAddr>() {
        sock.set_port(port);
        return sock.to_string();
    }
    match bind_address.rsplit_once(':') {
        Some((host, _)) => format!("{}:{}", host, port),
        None => format!("{}:{}", bind_address, port),
    }
}
