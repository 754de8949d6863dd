//! Background worker: push display and notification routing.

pub mod events;
pub mod handler;
pub mod payload;

pub use events::{EventKind, WorkerEvent};
pub use handler::{BackgroundDeliveryHandler, EventOutcome, IgnoreReason};
pub use payload::{
    DisplayedNotification, NotificationAction, NotificationData, NotificationOptions,
    NotificationPayload, WindowClient,
};
