//! Push payloads and the notifications built from them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::WorkerConfig;
use crate::error::{PushError, Result};

/// Action id of the tray button that only closes the notification.
pub const DISMISS_ACTION: &str = "dismiss";

/// Action id of the tray button that opens the target page.
pub const OPEN_ACTION: &str = "open";

/// Fallback navigation target.
pub const ROOT_URL: &str = "/";

/// Application routing data attached to a notification.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NotificationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Anything else the sender attached, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Inbound push payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationPayload {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub sound: Option<String>,
    /// Tray grouping key.
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub data: Option<NotificationData>,
    #[serde(default)]
    pub url: Option<String>,
}

impl NotificationPayload {
    /// Decode a payload from the raw push message body.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| PushError::invalid_payload(e.to_string()))
    }

    /// Decode a payload that already arrived as JSON.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| PushError::invalid_payload(e.to_string()))
    }

    /// Build display options, filling absent fields from `defaults`.
    ///
    /// Notifications auto-dismiss, are audible and always re-alert, even when
    /// an unseen notification with the same tag is still in the tray.
    pub fn to_options(&self, defaults: &WorkerConfig) -> NotificationOptions {
        let mut data = self.data.clone().unwrap_or_default();
        if data.url.is_none() {
            data.url = self.url.clone();
        }

        NotificationOptions {
            body: self.body.clone(),
            icon: self
                .icon
                .clone()
                .unwrap_or_else(|| defaults.default_icon.clone()),
            badge: self
                .badge
                .clone()
                .unwrap_or_else(|| defaults.default_badge.clone()),
            sound: self
                .sound
                .clone()
                .unwrap_or_else(|| defaults.default_sound.clone()),
            tag: self
                .tag
                .clone()
                .unwrap_or_else(|| defaults.default_tag.clone()),
            data,
            vibrate: defaults.vibrate.clone(),
            require_interaction: false,
            silent: false,
            renotify: true,
            actions: default_actions(),
        }
    }
}

/// A tray button.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

fn default_actions() -> Vec<NotificationAction> {
    vec![
        NotificationAction {
            action: OPEN_ACTION.to_string(),
            title: "Open".to_string(),
        },
        NotificationAction {
            action: DISMISS_ACTION.to_string(),
            title: "Dismiss".to_string(),
        },
    ]
}

/// Options handed to the platform's show-notification call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub sound: String,
    pub tag: String,
    pub data: NotificationData,
    pub vibrate: Vec<u32>,
    pub require_interaction: bool,
    pub silent: bool,
    pub renotify: bool,
    pub actions: Vec<NotificationAction>,
}

/// A notification as the platform reports it back in click/close events.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DisplayedNotification {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub data: Option<NotificationData>,
    #[serde(default)]
    pub url: Option<String>,
}

impl DisplayedNotification {
    /// Navigation target: `data.url`, then the notification's `url`, then `/`.
    pub fn target_url(&self) -> String {
        self.data
            .as_ref()
            .and_then(|d| d.url.as_deref())
            .filter(|u| !u.is_empty())
            .or_else(|| self.url.as_deref().filter(|u| !u.is_empty()))
            .unwrap_or(ROOT_URL)
            .to_string()
    }
}

/// An open application window seen from the worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
    /// Whether the client supports being focused.
    #[serde(default = "default_true")]
    pub focusable: bool,
    /// Whether this worker controls the window.
    #[serde(default = "default_true")]
    pub controlled: bool,
}

fn default_true() -> bool {
    true
}

impl WindowClient {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            focusable: true,
            controlled: true,
        }
    }

    /// Substring match against the navigation target.
    pub fn shows(&self, target_url: &str) -> bool {
        self.url.contains(target_url)
    }
}
