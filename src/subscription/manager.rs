//! Turns a permission grant into a live push subscription.

use crate::config::PushConfig;
use crate::core::record::PermissionStatus;
use crate::error::FailOpen;
use crate::platform::PushPlatform;
use crate::subscription::keys::url_base64_to_bytes;
use crate::subscription::{PushSubscriptionRecord, SubscribeOptions};

/// Subscription lifecycle over a [`PushPlatform`].
///
/// No operation fails past this boundary: problems are logged and surface
/// as `false` or `None`, and the next cycle tries again.
#[derive(Debug)]
pub struct SubscriptionManager<P: PushPlatform> {
    platform: P,
    /// URL-safe base64 VAPID public key.
    public_key: Option<String>,
}

impl<P: PushPlatform> SubscriptionManager<P> {
    pub fn new(platform: P, public_key: Option<String>) -> Self {
        let public_key = public_key.filter(|k| !k.trim().is_empty());
        Self {
            platform,
            public_key,
        }
    }

    pub fn from_config(platform: P, config: &PushConfig) -> Self {
        Self::new(platform, config.vapid_public_key.clone())
    }

    /// Workers, push and a configured public key are all present.
    pub fn is_supported(&self) -> bool {
        self.platform.supports_worker()
            && self.platform.supports_push()
            && self.public_key.is_some()
    }

    /// Current permission; `unsupported` when the subsystem is unavailable.
    pub async fn permission(&self) -> PermissionStatus {
        if !self.is_supported() {
            return PermissionStatus::Unsupported;
        }
        self.platform.permission().await
    }

    /// Make sure a worker is active, then ask for permission.
    ///
    /// An already active worker is reused. Returns true iff the user granted.
    pub async fn initialize(&self) -> bool {
        if !self.is_supported() {
            tracing::debug!("push unsupported, skipping initialize");
            return false;
        }

        if !self.platform.has_active_worker().await {
            if let Err(err) = self.platform.register_worker().await {
                tracing::warn!(error = %err, "worker registration failed");
                return false;
            }
            tracing::info!("registered push worker");
        }

        if let Err(err) = self.platform.worker_ready().await {
            tracing::warn!(error = %err, "worker never became ready");
            return false;
        }

        let status = self
            .platform
            .request_permission()
            .await
            .fail_open_with("requesting notification permission", PermissionStatus::Default);
        tracing::info!(permission = %status, "permission request answered");
        status.is_granted()
    }

    /// Subscribe with the configured application server key.
    pub async fn subscribe(&self) -> Option<PushSubscriptionRecord> {
        if !self.is_supported() {
            return None;
        }
        let key = self.public_key.as_deref()?;

        let application_server_key = match url_base64_to_bytes(key) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, "configured public key is not valid base64");
                return None;
            }
        };

        let options = SubscribeOptions {
            user_visible_only: true,
            application_server_key,
        };

        match self.platform.subscribe(&options).await {
            Ok(subscription) => {
                tracing::info!(endpoint = %subscription.endpoint, "push subscription created");
                Some(subscription)
            }
            Err(err) => {
                tracing::warn!(error = %err, "push subscription failed");
                None
            }
        }
    }

    /// Cancel the current subscription. False if none existed.
    pub async fn unsubscribe(&self) -> bool {
        if !self.platform.supports_push() {
            return false;
        }
        self.platform
            .unsubscribe()
            .await
            .fail_open_with("unsubscribing from push", false)
    }

    /// The current subscription, without side effects.
    pub async fn get_subscription(&self) -> Option<PushSubscriptionRecord> {
        if !self.platform.supports_push() {
            return None;
        }
        self.platform
            .get_subscription()
            .await
            .fail_open_default("reading push subscription")
    }
}
