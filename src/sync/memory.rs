//! In-memory settings transport for testing.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{PushError, Result};
use crate::sync::client::{
    FieldError, SettingsTransport, SettingsUpdate, SettingsUpdateResponse, SyncedSettings,
};

/// How the fake server answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMode {
    /// Store the settings and echo them back.
    Accepting,
    /// Answer with a field error carrying this message.
    Rejecting(String),
    /// Fail at the transport level.
    Unreachable,
}

#[derive(Debug)]
struct TransportState {
    mode: TransportMode,
    requests: Vec<(String, SettingsUpdate)>,
}

/// Settings transport that records every request.
#[derive(Debug)]
pub struct MemorySettingsTransport {
    state: Mutex<TransportState>,
}

impl Default for MemorySettingsTransport {
    fn default() -> Self {
        Self::with_mode(TransportMode::Accepting)
    }
}

impl MemorySettingsTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: TransportMode) -> Self {
        Self {
            state: Mutex::new(TransportState {
                mode,
                requests: Vec::new(),
            }),
        }
    }

    pub fn set_mode(&self, mode: TransportMode) {
        self.state().mode = mode;
    }

    /// Every `(user_id, update)` received, in order.
    pub fn requests(&self) -> Vec<(String, SettingsUpdate)> {
        self.state().requests.clone()
    }

    pub fn last_request(&self) -> Option<(String, SettingsUpdate)> {
        self.state().requests.last().cloned()
    }

    fn state(&self) -> MutexGuard<'_, TransportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SettingsTransport for MemorySettingsTransport {
    async fn update_settings(
        &self,
        user_id: &str,
        update: &SettingsUpdate,
    ) -> Result<SettingsUpdateResponse> {
        let mut state = self.state();
        state.requests.push((user_id.to_string(), update.clone()));

        match &state.mode {
            TransportMode::Accepting => Ok(SettingsUpdateResponse {
                settings: Some(SyncedSettings {
                    enable_browser_push_notifications: Some(
                        update.enable_browser_push_notifications,
                    ),
                    push_subscription_endpoint: Some(update.push_subscription_endpoint.clone()),
                }),
                errors: None,
            }),
            TransportMode::Rejecting(message) => Ok(SettingsUpdateResponse {
                settings: None,
                errors: Some(vec![FieldError {
                    field: None,
                    message: message.clone(),
                }]),
            }),
            TransportMode::Unreachable => Err(PushError::sync("connection refused")),
        }
    }
}
