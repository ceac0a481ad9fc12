//! File system seam used by the remote downloader.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// File operations the downloader needs, mockable in tests.
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn file_exists(&self, path: &Path) -> bool;

    /// Returns the size of a file if it exists.
    async fn file_size(&self, path: &Path) -> Option<u64>;

    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    /// Creates (or truncates) a file for writing.
    async fn create_file(&self, path: &Path) -> std::io::Result<tokio::fs::File>;

    async fn rename_file(&self, from: &Path, to: &Path) -> std::io::Result<()>;

    async fn remove_file(&self, path: &Path) -> std::io::Result<()>;

    /// Removes a file without waiting, ignoring errors. Usable from `Drop`.
    fn discard_file(&self, path: &Path);
}

/// Default file system implementation using `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn file_exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }

    async fn file_size(&self, path: &Path) -> Option<u64> {
        tokio::fs::metadata(path).await.ok().map(|m| m.len())
    }

    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn create_file(&self, path: &Path) -> std::io::Result<tokio::fs::File> {
        tokio::fs::File::create(path).await
    }

    async fn rename_file(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        tokio::fs::rename(from, to).await
    }

    async fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    fn discard_file(&self, path: &Path) {
        if let Err(e) = std::fs::remove_file(path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            log::warn!("Could not remove {}: {e}", path.display());
        }
    }
}

/// Returns the in-progress path for a final destination: `{path}.part`.
#[must_use]
pub fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn part_path_appends_extension() {
        assert_eq!(
            part_path(Path::new("music/Artist - Song.mp3")),
            PathBuf::from("music/Artist - Song.mp3.part")
        );
        assert_eq!(part_path(Path::new("a")), PathBuf::from("a.part"));
    }

    #[tokio::test]
    async fn exists_and_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("song.mp3");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"ID3").unwrap();

        let fs = TokioFileSystem::new();
        assert!(fs.file_exists(&path).await);
        assert_eq!(fs.file_size(&path).await, Some(3));
        let missing = dir.path().join("missing.mp3");
        assert!(!fs.file_exists(&missing).await);
        assert_eq!(fs.file_size(&missing).await, None);
    }

    #[tokio::test]
    async fn create_rename_remove() {
        let dir = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        let nested = dir.path().join("a/b");
        fs.create_dir_all(&nested).await.unwrap();

        let part = nested.join("x.mp3.part");
        let done = nested.join("x.mp3");
        drop(fs.create_file(&part).await.unwrap());
        fs.rename_file(&part, &done).await.unwrap();
        assert!(!part.exists());
        assert!(done.exists());

        fs.remove_file(&done).await.unwrap();
        assert!(!done.exists());
        assert!(fs.remove_file(&done).await.is_err());
    }

    #[test]
    fn discard_ignores_missing_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.mp3.part");
        std::fs::write(&path, b"partial").unwrap();

        let fs = TokioFileSystem::new();
        fs.discard_file(&path);
        assert!(!path.exists());
        fs.discard_file(&path);
    }
}
