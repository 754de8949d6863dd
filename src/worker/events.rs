//! Events delivered to the background worker.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PushError, Result};
use crate::worker::payload::{DisplayedNotification, NotificationPayload};

/// Event kind, used to key the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Push,
    NotificationClick,
    NotificationClose,
}

impl EventKind {
    /// Parse event kind from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "push" => Some(Self::Push),
            "notificationclick" | "notification-click" | "notification_click" => {
                Some(Self::NotificationClick)
            }
            "notificationclose" | "notification-close" | "notification_close" => {
                Some(Self::NotificationClose)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::NotificationClick => "notificationclick",
            Self::NotificationClose => "notificationclose",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A worker event as the host hands it over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerEvent {
    Push {
        /// Message body: a JSON string, or JSON already decoded by the host.
        #[serde(default)]
        data: Option<Value>,
    },
    NotificationClick {
        notification: DisplayedNotification,
        /// Id of the tray button pressed, absent for a body click.
        #[serde(default)]
        action: Option<String>,
    },
    NotificationClose {
        notification: DisplayedNotification,
    },
}

impl WorkerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Push { .. } => EventKind::Push,
            Self::NotificationClick { .. } => EventKind::NotificationClick,
            Self::NotificationClose { .. } => EventKind::NotificationClose,
        }
    }

    /// Decode an event from host JSON.
    pub fn parse(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| PushError::invalid_payload(e.to_string()))
    }

    /// Decode an event whose kind is already known, with the `type` tag optional.
    pub fn parse_as(kind: EventKind, input: &str) -> Result<Self> {
        let mut value: Value = serde_json::from_str(input)
            .map_err(|e| PushError::invalid_payload(e.to_string()))?;
        let Some(object) = value.as_object_mut() else {
            return Err(PushError::invalid_payload("event must be a JSON object"));
        };
        object.insert("type".to_string(), Value::String(kind.as_str().to_string()));
        serde_json::from_value(value).map_err(|e| PushError::invalid_payload(e.to_string()))
    }
}

/// Decode a push message body into a payload.
///
/// `Ok(None)` means there was nothing to show.
pub fn decode_push_data(data: Option<Value>) -> Result<Option<NotificationPayload>> {
    match data {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(Value::String(text)) => NotificationPayload::parse(&text).map(Some),
        Some(value) => NotificationPayload::from_value(value).map(Some),
    }
}
