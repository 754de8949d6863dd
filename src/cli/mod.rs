//! CLI commands for pushgate.
//!
//! This module provides diagnostic commands, organized into:
//! - **Prompt commands**: status, start, dismiss, reset (local prompt history)
//! - **Worker command**: worker (runs one background event)

// Prompt commands
pub mod dismiss;
pub mod reset;
pub mod start;
pub mod status;

// Worker command
pub mod worker;

pub use dismiss::DismissCommand;
pub use reset::ResetCommand;
pub use start::StartCommand;
pub use status::StatusCommand;
pub use worker::WorkerCommand;
