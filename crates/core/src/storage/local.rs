use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::errors::CoreError;

use super::traits::FileStorage;

/// Application name used for the data directory.
const APP_NAME: &str = "kamas-tracker";

/// File storage on the local disk, rooted at one directory.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root at `<platform data dir>/kamas-tracker`.
    pub fn in_default_dir() -> Result<Self, CoreError> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            CoreError::Initialization("Could not find the platform data directory".into())
        })?;
        Ok(Self::new(data_dir.join(APP_NAME)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn prepare(&self) -> Result<(), CoreError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            CoreError::Initialization(format!(
                "Unable to prepare data directory {}: {e}",
                self.root.display()
            ))
        })
    }

    async fn exists(&self, path: &str) -> Result<bool, CoreError> {
        Ok(tokio::fs::try_exists(self.resolve(path)).await?)
    }

    async fn read_text(&self, path: &str) -> Result<String, CoreError> {
        tokio::fs::read_to_string(self.resolve(path))
            .await
            .map_err(|e| CoreError::FileIO(format!("{path}: {e}")))
    }

    /// Writes to `<path>.tmp` first and renames it into place, so readers
    /// see either the old file or the complete new one.
    async fn write_text(&self, path: &str, contents: &str) -> Result<(), CoreError> {
        let target = self.resolve(path);
        let tmp = self.resolve(&format!("{path}.tmp"));
        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|e| CoreError::FileIO(format!("{path}: {e}")))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| CoreError::FileIO(format!("{path}: {e}")))
    }

    async fn remove(&self, path: &str) -> Result<(), CoreError> {
        match tokio::fs::remove_file(self.resolve(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::FileIO(format!("{path}: {e}"))),
        }
    }
}
