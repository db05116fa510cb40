use futures::future::try_join_all;
use ignore::WalkBuilder;
use mfu_core::NewFile;
use std::path::{Path, PathBuf};

use super::ClientError;

/// A file to upload and the name it is sent under
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    path: PathBuf,
    name: String,
}

/// Expand `paths` into the ordered list of files to upload.
///
/// Files are taken as given. Directories are walked (gitignore-aware unless
/// `respect_gitignore` is false) and their files added in path order, named by
/// their path relative to the directory.
pub fn collect_files(paths: &[PathBuf], respect_gitignore: bool) -> Result<Vec<(PathBuf, String)>, ClientError> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            out.extend(walk_dir(path, respect_gitignore)?);
        } else {
            out.push(Entry {
                path: path.clone(),
                name: base_name(path),
            });
        }
    }
    Ok(out.into_iter().map(|e| (e.path, e.name)).collect())
}

fn walk_dir(dir: &Path, respect_gitignore: bool) -> Result<Vec<Entry>, ClientError> {
    let walker = WalkBuilder::new(dir)
        .git_ignore(respect_gitignore)
        .git_global(respect_gitignore)
        .git_exclude(respect_gitignore)
        .hidden(false)
        .build();

    let mut entries = Vec::new();
    for result in walker {
        let entry = result.map_err(|source| ClientError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        // Skip git internals when walking a repository checkout
        if path.components().any(|c| c.as_os_str() == ".git") {
            continue;
        }
        let name = path
            .strip_prefix(dir)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| base_name(path));
        entries.push(Entry {
            path: path.to_path_buf(),
            name,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Read every file, keeping order
pub async fn read_files(files: &[(PathBuf, String)]) -> Result<Vec<NewFile>, ClientError> {
    try_join_all(files.iter().map(|(path, name)| async move {
        let content = tokio::fs::read(path)
            .await
            .map_err(|source| ClientError::ReadFile {
                path: path.clone(),
                source,
            })?;
        Ok::<_, ClientError>(NewFile::new(name.clone(), content))
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(files: &[(PathBuf, String)]) -> Vec<&str> {
        files.iter().map(|(_, name)| name.as_str()).collect()
    }

    #[test]
    fn test_explicit_files_keep_order() {
        let dir = TempDir::new().unwrap();
        let b = dir.path().join("b.txt");
        let a = dir.path().join("a.txt");
        std::fs::write(&b, "B").unwrap();
        std::fs::write(&a, "A").unwrap();

        let files = collect_files(&[b, a], true).unwrap();
        assert_eq!(names(&files), vec!["b.txt", "a.txt"]);
    }

    #[test]
    fn test_directory_is_walked_sorted() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("z.txt"), "Z").unwrap();
        std::fs::write(dir.path().join("a.txt"), "A").unwrap();
        std::fs::write(dir.path().join("sub").join("m.txt"), "M").unwrap();

        let files = collect_files(&[dir.path().to_path_buf()], true).unwrap();
        assert_eq!(names(&files), vec!["a.txt", "sub/m.txt", "z.txt"]);
    }

    #[tokio::test]
    async fn test_read_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("one"), "1").unwrap();
        std::fs::write(dir.path().join("two"), "22").unwrap();

        let files = collect_files(&[dir.path().to_path_buf()], true).unwrap();
        let read = read_files(&files).await.unwrap();
        assert_eq!(read[0], NewFile::new("one", "1"));
        assert_eq!(read[1], NewFile::new("two", "22"));

        let missing = vec![(dir.path().join("nope"), "nope".to_string())];
        assert!(matches!(
            read_files(&missing).await,
            Err(ClientError::ReadFile { .. })
        ));
    }
}
