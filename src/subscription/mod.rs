//! Push subscription lifecycle.

pub mod keys;
pub mod manager;
pub mod record;

pub use keys::{bytes_to_base64, url_base64_to_bytes};
pub use manager::SubscriptionManager;
pub use record::{EncodedKeys, PushSubscriptionRecord, SubscribeOptions, SubscriptionKeys};
