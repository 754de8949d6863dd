//! Capability seams over the push-capable runtime.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::record::PermissionStatus;
use crate::error::Result;
use crate::subscription::{PushSubscriptionRecord, SubscribeOptions};
use crate::worker::payload::{NotificationOptions, WindowClient};

/// Foreground platform: worker registration, permission and subscriptions.
#[async_trait]
pub trait PushPlatform: Send + Sync {
    /// Background workers can be registered.
    fn supports_worker(&self) -> bool;

    /// A push manager is available.
    fn supports_push(&self) -> bool;

    /// Current notification permission, without prompting.
    async fn permission(&self) -> PermissionStatus;

    /// A worker is already registered and active.
    async fn has_active_worker(&self) -> bool;

    /// Register the background worker.
    async fn register_worker(&self) -> Result<()>;

    /// Wait until a worker is active.
    async fn worker_ready(&self) -> Result<()>;

    /// Ask the user for notification permission.
    async fn request_permission(&self) -> Result<PermissionStatus>;

    /// Create a push subscription.
    async fn subscribe(&self, options: &SubscribeOptions) -> Result<PushSubscriptionRecord>;

    /// The current subscription, if any.
    async fn get_subscription(&self) -> Result<Option<PushSubscriptionRecord>>;

    /// Cancel the current subscription. `Ok(false)` when there was none.
    async fn unsubscribe(&self) -> Result<bool>;
}

#[async_trait]
impl<T: PushPlatform + ?Sized> PushPlatform for Arc<T> {
    fn supports_worker(&self) -> bool {
        (**self).supports_worker()
    }

    fn supports_push(&self) -> bool {
        (**self).supports_push()
    }

    async fn permission(&self) -> PermissionStatus {
        (**self).permission().await
    }

    async fn has_active_worker(&self) -> bool {
        (**self).has_active_worker().await
    }

    async fn register_worker(&self) -> Result<()> {
        (**self).register_worker().await
    }

    async fn worker_ready(&self) -> Result<()> {
        (**self).worker_ready().await
    }

    async fn request_permission(&self) -> Result<PermissionStatus> {
        (**self).request_permission().await
    }

    async fn subscribe(&self, options: &SubscribeOptions) -> Result<PushSubscriptionRecord> {
        (**self).subscribe(options).await
    }

    async fn get_subscription(&self) -> Result<Option<PushSubscriptionRecord>> {
        (**self).get_subscription().await
    }

    async fn unsubscribe(&self) -> Result<bool> {
        (**self).unsubscribe().await
    }
}

/// Background context: showing notifications and steering windows.
#[async_trait]
pub trait WorkerHost: Send + Sync {
    fn supports_notifications(&self) -> bool;

    async fn permission(&self) -> PermissionStatus;

    async fn show_notification(&self, title: &str, options: &NotificationOptions) -> Result<()>;

    async fn close_notification(&self, id: &str) -> Result<()>;

    /// Window clients of the application.
    async fn match_window_clients(&self, include_uncontrolled: bool) -> Result<Vec<WindowClient>>;

    async fn focus_client(&self, id: &str) -> Result<()>;

    fn supports_open_window(&self) -> bool;

    async fn open_window(&self, url: &str) -> Result<()>;
}

#[async_trait]
impl<T: WorkerHost + ?Sized> WorkerHost for Arc<T> {
    fn supports_notifications(&self) -> bool {
        (**self).supports_notifications()
    }

    async fn permission(&self) -> PermissionStatus {
        (**self).permission().await
    }

    async fn show_notification(&self, title: &str, options: &NotificationOptions) -> Result<()> {
        (**self).show_notification(title, options).await
    }

    async fn close_notification(&self, id: &str) -> Result<()> {
        (**self).close_notification(id).await
    }

    async fn match_window_clients(&self, include_uncontrolled: bool) -> Result<Vec<WindowClient>> {
        (**self).match_window_clients(include_uncontrolled).await
    }

    async fn focus_client(&self, id: &str) -> Result<()> {
        (**self).focus_client(id).await
    }

    fn supports_open_window(&self) -> bool {
        (**self).supports_open_window()
    }

    async fn open_window(&self, url: &str) -> Result<()> {
        (**self).open_window(url).await
    }
}
