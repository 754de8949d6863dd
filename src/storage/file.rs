//! File-based key/value storage for pushgate.
//!
//! Each key is stored as `<dir>/<key>.json`. Atomic writes are achieved via
//! temp file + rename.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::config::storage_dir;
use crate::error::{PushError, Result};
use crate::storage::KeyValueStore;

/// File-based key/value store.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    /// Directory holding one file per key.
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Create a store in the default directory (`<home>/storage/`).
    pub fn new() -> Result<Self> {
        let dir = storage_dir().ok_or_else(|| {
            PushError::config("Could not determine storage directory (no home directory)")
        })?;
        Self::with_dir(dir)
    }

    /// Create a store in a custom directory, creating it if needed.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();

        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| PushError::storage(&dir, e))?;
        }

        Ok(Self { dir })
    }

    /// Keys become file names, so only a conservative alphabet is allowed.
    fn validate_key(key: &str) -> Result<()> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(())
        } else {
            Err(PushError::storage_unavailable(format!(
                "invalid storage key: {:?}",
                key
            )))
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{}.json.tmp", key))
    }

    async fn atomic_write(&self, key: &str, value: &str) -> Result<()> {
        let final_path = self.entry_path(key);
        let temp_path = self.temp_path(key);

        {
            let mut file = fs::File::create(&temp_path)
                .await
                .map_err(|e| PushError::storage(&temp_path, e))?;
            file.write_all(value.as_bytes())
                .await
                .map_err(|e| PushError::storage(&temp_path, e))?;
            file.sync_all()
                .await
                .map_err(|e| PushError::storage(&temp_path, e))?;
        }

        // Rename temp file to final path (atomic on POSIX)
        fs::rename(&temp_path, &final_path)
            .await
            .map_err(|e| PushError::storage(&final_path, e))?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Self::validate_key(key)?;
        let path = self.entry_path(key);

        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PushError::storage(&path, e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        Self::validate_key(key)?;
        self.atomic_write(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        Self::validate_key(key)?;
        let path = self.entry_path(key);

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(PushError::storage(&path, e)),
        }

        // Also clean up any temp file
        let _ = fs::remove_file(self.temp_path(key)).await;

        Ok(())
    }
}
