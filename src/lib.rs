//! Pushgate - Push-Notification Consent and Delivery
//!
//! Pushgate decides when to ask a user for notification permission, turns a
//! grant into a push subscription registered with the settings API, and
//! renders and routes incoming pushes in the background worker.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod platform;
pub mod storage;
pub mod subscription;
pub mod sync;
pub mod worker;

pub use config::Config;
pub use core::{
    AcceptOutcome, DisableOutcome, PermissionPromptRecord, PermissionStatus, PromptBlocker,
    PromptDecision, PromptEngine, PromptPolicy, PromptResponse, ReconcileOutcome,
};
pub use error::{FailOpen, PushError, Result};
pub use platform::{
    HostAction, MemoryPushPlatform, PushPlatform, RecordingWorkerHost, WorkerHost,
};
pub use storage::{
    FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, PermissionStateStore,
    PROMPT_RECORD_KEY, SYNC_STATE_KEY,
};
pub use subscription::{PushSubscriptionRecord, SubscriptionManager};
pub use sync::{
    BackendSyncClient, HttpSettingsTransport, MemorySettingsTransport, SettingsTransport,
    SyncLedger,
};
pub use worker::{BackgroundDeliveryHandler, EventKind, EventOutcome, WorkerEvent};

// CLI commands
pub use cli::{DismissCommand, ResetCommand, StartCommand, StatusCommand, WorkerCommand};
