//! Last subscription endpoint the server confirmed, and for which user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FailOpen, Result};
use crate::storage::{KeyValueStore, SYNC_STATE_KEY};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    #[serde(default)]
    pub confirmed_endpoint: Option<String>,
    #[serde(default)]
    pub confirmed_user_id: Option<String>,
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Persistent record of what the server knows about this device.
#[derive(Debug)]
pub struct SyncLedger<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> SyncLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Current state; missing, corrupt or unreadable reads as empty.
    pub async fn load(&self) -> SyncState {
        self.try_load().await.fail_open_default("reading sync ledger")
    }

    /// Whether the server has not yet confirmed `endpoint` for `user_id`.
    pub async fn needs_sync(&self, endpoint: &str, user_id: &str) -> bool {
        let state = self.load().await;
        state.confirmed_endpoint.as_deref() != Some(endpoint)
            || state.confirmed_user_id.as_deref() != Some(user_id)
    }

    /// Record a server confirmation of `endpoint` for `user_id`.
    pub async fn confirm(&self, endpoint: &str, user_id: &str, now: DateTime<Utc>) -> Result<()> {
        let state = SyncState {
            confirmed_endpoint: Some(endpoint.to_string()),
            confirmed_user_id: Some(user_id.to_string()),
            confirmed_at: Some(now),
        };
        self.store
            .set(SYNC_STATE_KEY, &serde_json::to_string(&state)?)
            .await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.remove(SYNC_STATE_KEY).await
    }

    async fn try_load(&self) -> Result<SyncState> {
        let Some(json) = self.store.get(SYNC_STATE_KEY).await? else {
            return Ok(SyncState::default());
        };
        Ok(serde_json::from_str(&json).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "corrupt sync ledger, treating as empty");
            SyncState::default()
        }))
    }
}
