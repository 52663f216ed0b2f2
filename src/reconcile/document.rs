//! The routing document on disk.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Storage of the rendered document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn path(&self) -> &Path;

    /// Current bytes, or `None` when no document exists yet.
    async fn read(&self) -> io::Result<Option<Vec<u8>>>;

    /// Replace the document; readers see either the old or the new one.
    async fn replace(&self, content: &str) -> io::Result<()>;
}

/// Document stored as a file, replaced via a sibling temp file and rename.
pub struct FileDocument {
    path: PathBuf,
}

impl FileDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}

#[async_trait]
impl DocumentStore for FileDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn replace(&self, content: &str) -> io::Result<()> {
        let temp = self.temp_path();

        let written = async {
            let mut file = fs::File::create(&temp).await?;
            file.write_all(content.as_bytes()).await?;
            file.sync_all().await?;
            fs::rename(&temp, &self.path).await
        }
        .await;

        if written.is_err() {
            let _ = fs::remove_file(&temp).await;
        }
        written
    }
}
