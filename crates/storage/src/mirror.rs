use std::io::ErrorKind;
use std::path::PathBuf;

use crate::store::{MirrorStore, StoreError};

/// Mirror backup kept as a single JSON file next to the database.
#[derive(Debug, Clone)]
pub struct FileMirror {
    path: PathBuf,
}

impl FileMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileMirror { path: path.into() }
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl MirrorStore for FileMirror {
    async fn read(&self) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the file via a rename so a crash never leaves half a snapshot.
    async fn write(&self, snapshot: String) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = self.staging_path();
        tokio::fs::write(&staging, snapshot).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_no_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = FileMirror::new(dir.path().join("mirror.json"));
        assert_eq!(mirror.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn write_creates_parent_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = FileMirror::new(dir.path().join("nested").join("mirror.json"));
        mirror.write("[]".to_string()).await.unwrap();
        mirror.write("[{}]".to_string()).await.unwrap();
        assert_eq!(mirror.read().await.unwrap().as_deref(), Some("[{}]"));
        assert!(!mirror.staging_path().exists());
    }
}
