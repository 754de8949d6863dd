//! Durable prompt history with once-per-start session counting.

use tokio::sync::OnceCell;

use crate::core::record::PermissionPromptRecord;
use crate::error::{FailOpen, Result};
use crate::storage::{KeyValueStore, PROMPT_RECORD_KEY};

/// Prompt history store.
///
/// One instance lives for one application start. The first [`read`] counts
/// the start; concurrent and later reads on the same instance never count
/// it again.
///
/// [`read`]: PermissionStateStore::read
#[derive(Debug)]
pub struct PermissionStateStore<S: KeyValueStore> {
    store: S,
    /// Whether this start was counted and persisted.
    session_counted: OnceCell<bool>,
}

impl<S: KeyValueStore> PermissionStateStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            session_counted: OnceCell::new(),
        }
    }

    /// Read the record, counting this application start on first use.
    ///
    /// Never fails. If storage is unavailable the default record is
    /// returned, whose zero session count keeps the prompt hidden.
    pub async fn read(&self) -> PermissionPromptRecord {
        let counted = *self
            .session_counted
            .get_or_init(|| self.count_session())
            .await;

        if !counted {
            return PermissionPromptRecord::default();
        }

        self.load().await.fail_open_default("reading prompt record")
    }

    /// Read the record without counting a session.
    pub async fn peek(&self) -> Result<PermissionPromptRecord> {
        self.load().await
    }

    /// Overwrite the full record.
    pub async fn write(&self, record: &PermissionPromptRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        self.store.set(PROMPT_RECORD_KEY, &json).await
    }

    /// Restore defaults by removing the stored record.
    pub async fn reset(&self) -> Result<()> {
        tracing::info!("resetting prompt record");
        self.store.remove(PROMPT_RECORD_KEY).await
    }

    /// Whether this instance already counted its application start.
    pub fn session_counted(&self) -> bool {
        self.session_counted.get().copied().unwrap_or(false)
    }

    async fn count_session(&self) -> bool {
        let mut record = match self.load().await {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(error = %err, "prompt record unavailable, prompting disabled");
                return false;
            }
        };

        record.begin_session();

        match self.write(&record).await {
            Ok(()) => {
                tracing::debug!(session_count = record.session_count, "counted application start");
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to persist session count, prompting disabled");
                false
            }
        }
    }

    /// Load the stored record; missing or corrupt entries read as defaults.
    async fn load(&self) -> Result<PermissionPromptRecord> {
        let Some(json) = self.store.get(PROMPT_RECORD_KEY).await? else {
            return Ok(PermissionPromptRecord::default());
        };

        match serde_json::from_str(&json) {
            Ok(record) => Ok(record),
            Err(err) => {
                tracing::warn!(error = %err, "corrupt prompt record, using defaults");
                Ok(PermissionPromptRecord::default())
            }
        }
    }
}
