//! Core types and logic for pushgate.
//!
//! This module contains the prompt history record, the pure prompt policy,
//! and the engine that drives the prompt through a user's answer.

pub mod engine;
pub mod policy;
pub mod record;

pub use engine::{AcceptOutcome, Clock, DisableOutcome, PromptEngine, ReconcileOutcome};
pub use policy::{PromptBlocker, PromptDecision, PromptPolicy, PromptResponse};
pub use record::{PermissionPromptRecord, PermissionStatus, MS_PER_DAY, RECORD_SCHEMA_VERSION};
