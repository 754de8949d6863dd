//! Server-side registration of push subscriptions.

pub mod client;
pub mod ledger;
pub mod memory;

pub use client::{
    BackendSyncClient, FieldError, HttpSettingsTransport, SettingsTransport, SettingsUpdate,
    SettingsUpdateResponse, SyncedSettings,
};
pub use ledger::{SyncLedger, SyncState};
pub use memory::{MemorySettingsTransport, TransportMode};
