//! Filesystem access used by the watcher.

use std::io;
use std::path::Path;

/// Reads candidate result files.
#[async_trait::async_trait]
pub trait FileProbe: Send + Sync + 'static {
    async fn is_dir(&self, path: &Path) -> bool;

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// [`FileProbe`] over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileProbe;

#[async_trait::async_trait]
impl FileProbe for LocalFileProbe {
    async fn is_dir(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}
