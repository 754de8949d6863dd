//! Worker host that records what it was asked to do.
//!
//! Backs the `worker` CLI command and the delivery handler tests. Tray
//! behavior follows the platform rule: a notification replaces any other
//! with the same tag, and alerts only when new or when `renotify` is set.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::record::PermissionStatus;
use crate::error::{PushError, Result};
use crate::platform::WorkerHost;
use crate::worker::payload::{NotificationOptions, WindowClient};

/// One observable side effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HostAction {
    Shown {
        id: String,
        title: String,
        tag: String,
        renotify: bool,
        /// Whether the user was alerted (sound/vibration).
        alerted: bool,
        options: NotificationOptions,
    },
    Closed {
        id: String,
    },
    Focused {
        client_id: String,
    },
    Opened {
        url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrayEntry {
    pub id: String,
    pub tag: String,
    pub title: String,
}

#[derive(Debug, Default)]
struct HostState {
    actions: Vec<HostAction>,
    tray: Vec<TrayEntry>,
    clients: Vec<WindowClient>,
    shown: u32,
}

/// Recording [`WorkerHost`].
#[derive(Debug)]
pub struct RecordingWorkerHost {
    notifications_supported: bool,
    open_window_supported: bool,
    permission: PermissionStatus,
    fail_show: bool,
    state: Mutex<HostState>,
}

impl Default for RecordingWorkerHost {
    fn default() -> Self {
        Self {
            notifications_supported: true,
            open_window_supported: true,
            permission: PermissionStatus::Granted,
            fail_show: false,
            state: Mutex::new(HostState::default()),
        }
    }
}

impl RecordingWorkerHost {
    /// A host with notifications granted and no open windows.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_permission(mut self, permission: PermissionStatus) -> Self {
        self.permission = permission;
        self
    }

    pub fn without_notifications(mut self) -> Self {
        self.notifications_supported = false;
        self
    }

    pub fn without_open_window(mut self) -> Self {
        self.open_window_supported = false;
        self
    }

    pub fn failing_show(mut self) -> Self {
        self.fail_show = true;
        self
    }

    pub fn with_clients(mut self, clients: Vec<WindowClient>) -> Self {
        self.state_mut().clients = clients;
        self
    }

    pub fn actions(&self) -> Vec<HostAction> {
        self.state().actions.clone()
    }

    /// Notifications currently in the tray, oldest first.
    pub fn tray(&self) -> Vec<TrayEntry> {
        self.state().tray.clone()
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&mut self) -> &mut HostState {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl WorkerHost for RecordingWorkerHost {
    fn supports_notifications(&self) -> bool {
        self.notifications_supported
    }

    async fn permission(&self) -> PermissionStatus {
        if !self.notifications_supported {
            return PermissionStatus::Unsupported;
        }
        self.permission
    }

    async fn show_notification(&self, title: &str, options: &NotificationOptions) -> Result<()> {
        if !self.notifications_supported {
            return Err(PushError::unsupported("notifications"));
        }
        if self.fail_show {
            return Err(PushError::platform("show notification failed"));
        }

        let mut state = self.state();
        state.shown += 1;
        let id = format!("notification-{}", state.shown);

        let replaced = state.tray.iter().any(|e| e.tag == options.tag);
        state.tray.retain(|e| e.tag != options.tag);
        state.tray.push(TrayEntry {
            id: id.clone(),
            tag: options.tag.clone(),
            title: title.to_string(),
        });

        let alerted = !options.silent && (options.renotify || !replaced);
        state.actions.push(HostAction::Shown {
            id,
            title: title.to_string(),
            tag: options.tag.clone(),
            renotify: options.renotify,
            alerted,
            options: options.clone(),
        });
        Ok(())
    }

    async fn close_notification(&self, id: &str) -> Result<()> {
        let mut state = self.state();
        state.tray.retain(|e| e.id != id);
        state.actions.push(HostAction::Closed { id: id.to_string() });
        Ok(())
    }

    async fn match_window_clients(&self, include_uncontrolled: bool) -> Result<Vec<WindowClient>> {
        Ok(self
            .state()
            .clients
            .iter()
            .filter(|c| include_uncontrolled || c.controlled)
            .cloned()
            .collect())
    }

    async fn focus_client(&self, id: &str) -> Result<()> {
        let mut state = self.state();
        let focusable = state.clients.iter().any(|c| c.id == id && c.focusable);
        if !focusable {
            return Err(PushError::platform(format!("client {} cannot be focused", id)));
        }
        state.actions.push(HostAction::Focused {
            client_id: id.to_string(),
        });
        Ok(())
    }

    fn supports_open_window(&self) -> bool {
        self.open_window_supported
    }

    async fn open_window(&self, url: &str) -> Result<()> {
        if !self.open_window_supported {
            return Err(PushError::unsupported("open window"));
        }
        self.state().actions.push(HostAction::Opened {
            url: url.to_string(),
        });
        Ok(())
    }
}
