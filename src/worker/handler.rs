//! Background delivery handler.
//!
//! Runs in the worker context, which shares no memory with the foreground.
//! Every handler degrades to "no notification" or "no navigation"; nothing
//! escapes [`BackgroundDeliveryHandler::dispatch`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::WorkerConfig;
use crate::error::FailOpen;
use crate::platform::WorkerHost;
use crate::worker::events::{decode_push_data, WorkerEvent};
use crate::worker::payload::{DisplayedNotification, DISMISS_ACTION};

/// Why a push produced no notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    NoPayload,
    MalformedPayload,
    NotificationsUnsupported,
    PermissionNotGranted,
    DisplayFailed,
}

/// What handling an event ended up doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventOutcome {
    Displayed { title: String, tag: String },
    Ignored { reason: IgnoreReason },
    /// The dismiss button was pressed.
    Dismissed,
    Focused { client_id: String, url: String },
    Opened { url: String },
    /// No window matched and none could be opened.
    NotNavigated { url: String },
    Closed,
}

/// Dispatcher for worker events.
pub struct BackgroundDeliveryHandler<H: WorkerHost> {
    host: H,
    defaults: WorkerConfig,
}

impl<H: WorkerHost> BackgroundDeliveryHandler<H> {
    pub fn new(host: H, defaults: WorkerConfig) -> Self {
        Self { host, defaults }
    }

    /// Handle one event. Completes only after the platform calls it makes.
    pub async fn dispatch(&self, event: WorkerEvent) -> EventOutcome {
        let kind = event.kind();
        let outcome = match event {
            WorkerEvent::Push { data } => self.handle_push(data).await,
            WorkerEvent::NotificationClick {
                notification,
                action,
            } => self.handle_click(notification, action).await,
            WorkerEvent::NotificationClose { notification } => {
                self.handle_close(notification).await
            }
        };
        tracing::debug!(event = %kind, outcome = ?outcome, "worker event handled");
        outcome
    }

    // =========================================================================
    // Push
    // =========================================================================

    async fn handle_push(&self, data: Option<Value>) -> EventOutcome {
        let payload = match decode_push_data(data) {
            Ok(Some(payload)) => payload,
            Ok(None) => return ignored(IgnoreReason::NoPayload),
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed push payload");
                return ignored(IgnoreReason::MalformedPayload);
            }
        };

        if !self.host.supports_notifications() {
            return ignored(IgnoreReason::NotificationsUnsupported);
        }
        if !self.host.permission().await.is_granted() {
            return ignored(IgnoreReason::PermissionNotGranted);
        }

        let options = payload.to_options(&self.defaults);
        match self.host.show_notification(&payload.title, &options).await {
            Ok(()) => EventOutcome::Displayed {
                title: payload.title,
                tag: options.tag,
            },
            Err(err) => {
                tracing::warn!(error = %err, "failed to show notification");
                ignored(IgnoreReason::DisplayFailed)
            }
        }
    }

    // =========================================================================
    // Click
    // =========================================================================

    async fn handle_click(
        &self,
        notification: DisplayedNotification,
        action: Option<String>,
    ) -> EventOutcome {
        self.host
            .close_notification(&notification.id)
            .await
            .fail_open_default("closing clicked notification");

        if action.as_deref() == Some(DISMISS_ACTION) {
            return EventOutcome::Dismissed;
        }

        let url = notification.target_url();
        let clients = self
            .host
            .match_window_clients(true)
            .await
            .fail_open_default("listing window clients");

        for client in clients.iter().filter(|c| c.focusable && c.shows(&url)) {
            match self.host.focus_client(&client.id).await {
                Ok(()) => {
                    return EventOutcome::Focused {
                        client_id: client.id.clone(),
                        url,
                    }
                }
                Err(err) => {
                    tracing::debug!(client = %client.id, error = %err, "focus failed");
                }
            }
        }

        if self.host.supports_open_window() {
            match self.host.open_window(&url).await {
                Ok(()) => return EventOutcome::Opened { url },
                Err(err) => tracing::warn!(url = %url, error = %err, "failed to open window"),
            }
        }

        EventOutcome::NotNavigated { url }
    }

    // =========================================================================
    // Close
    // =========================================================================

    async fn handle_close(&self, notification: DisplayedNotification) -> EventOutcome {
        tracing::debug!(
            id = %notification.id,
            tag = ?notification.tag,
            "notification closed"
        );
        EventOutcome::Closed
    }
}

fn ignored(reason: IgnoreReason) -> EventOutcome {
    tracing::debug!(reason = ?reason, "push ignored");
    EventOutcome::Ignored { reason }
}
