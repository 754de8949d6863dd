//! Platform capabilities used by pushgate.
//!
//! The foreground side ([`PushPlatform`]) and the background worker side
//! ([`WorkerHost`]) share no state. Both ship with in-memory doubles.

pub mod memory;
pub mod recording;
pub mod traits;

pub use memory::MemoryPushPlatform;
pub use recording::{HostAction, RecordingWorkerHost, TrayEntry};
pub use traits::{PushPlatform, WorkerHost};
