//! Key/value storage traits for pushgate.
//!
//! Local persistence is a flat map of string keys to JSON documents, the
//! same shape as the browser's local storage the records were designed for.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// Storage key of the persisted prompt history.
pub const PROMPT_RECORD_KEY: &str = "notificationPromptData";

/// Storage key of the last server-confirmed subscription.
pub const SYNC_STATE_KEY: &str = "notificationSyncState";

/// Trait for durable key/value backends.
///
/// Writes overwrite the full value; there is no merge logic and the last
/// writer wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Returns `Ok(None)` if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Returns `Ok(())` even if the key doesn't exist.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Check if a key exists.
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Blanket implementation so one store can back several components.
#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key).await
    }
}
