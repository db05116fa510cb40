use mfu_core::Digest;
use std::path::{Path, PathBuf};

use super::ClientError;

/// Local file holding the root pinned at upload time
#[derive(Debug, Clone)]
pub struct RootMarker {
    path: PathBuf,
}

impl RootMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, root: &Digest) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        std::fs::write(&self.path, root.as_str()).map_err(|source| self.io_error(source))
    }

    pub fn read(&self) -> Result<Digest, ClientError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        Digest::parse(&text).map_err(|source| ClientError::InvalidRoot {
            path: self.path.clone(),
            source,
        })
    }

    fn io_error(&self, source: std::io::Error) -> ClientError {
        ClientError::RootMarker {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mfu_core::sha256;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let marker = RootMarker::new(dir.path().join("nested").join(".merkleroot"));
        let root = sha256(b"root");

        marker.write(&root).unwrap();
        assert_eq!(marker.read().unwrap(), root);
    }

    #[test]
    fn test_missing_marker() {
        let dir = TempDir::new().unwrap();
        let marker = RootMarker::new(dir.path().join(".merkleroot"));
        assert!(matches!(marker.read(), Err(ClientError::RootMarker { .. })));
    }

    #[test]
    fn test_garbage_marker() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".merkleroot");
        std::fs::write(&path, "not a hash").unwrap();
        assert!(matches!(
            RootMarker::new(path).read(),
            Err(ClientError::InvalidRoot { .. })
        ));
    }
}
