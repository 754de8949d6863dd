//! Push subscription types owned by the platform.

use serde::{Deserialize, Serialize};

use crate::subscription::keys::bytes_to_base64;

/// Encryption material for payload delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionKeys {
    /// Client public key (P-256 ECDH, uncompressed point).
    pub p256dh: Vec<u8>,
    /// Authentication secret.
    pub auth: Vec<u8>,
}

impl SubscriptionKeys {
    /// Keys as standard base64, the shape the settings API stores.
    pub fn to_encoded(&self) -> EncodedKeys {
        EncodedKeys {
            p256dh: bytes_to_base64(&self.p256dh),
            auth: bytes_to_base64(&self.auth),
        }
    }
}

/// Base64 form of [`SubscriptionKeys`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedKeys {
    pub p256dh: String,
    pub auth: String,
}

/// A live push subscription.
///
/// Referenced, never persisted: the platform is the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSubscriptionRecord {
    /// Delivery address assigned by the push service.
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

impl PushSubscriptionRecord {
    pub fn new(endpoint: impl Into<String>, p256dh: Vec<u8>, auth: Vec<u8>) -> Self {
        Self {
            endpoint: endpoint.into(),
            keys: SubscriptionKeys { p256dh, auth },
        }
    }
}

/// Options passed to the platform when subscribing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Every push must surface a visible notification.
    pub user_visible_only: bool,
    /// Decoded VAPID public key.
    pub application_server_key: Vec<u8>,
}
