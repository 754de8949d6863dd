//! Local persistence for pushgate.
//!
//! A small key/value layer with file-based and in-memory backends, and the
//! prompt history store built on top of it.

pub mod file;
pub mod memory;
pub mod prompt_store;
pub mod traits;

pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;
pub use prompt_store::PermissionStateStore;
pub use traits::{KeyValueStore, PROMPT_RECORD_KEY, SYNC_STATE_KEY};
