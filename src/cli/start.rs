//! Start command for pushgate.
//!
//! Records one application start, exactly as the application does on boot.

use serde::{Deserialize, Serialize};

use crate::core::PermissionPromptRecord;
use crate::storage::{KeyValueStore, PermissionStateStore};

/// Options for the start command.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Output format for the start command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartOutput {
    pub success: bool,
    pub record: PermissionPromptRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The start command implementation.
pub struct StartCommand<S: KeyValueStore> {
    store: PermissionStateStore<S>,
}

impl<S: KeyValueStore> StartCommand<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: PermissionStateStore::new(store),
        }
    }

    pub async fn run(&self) -> StartOutput {
        let record = self.store.read().await;
        if self.store.session_counted() {
            StartOutput {
                success: true,
                record,
                error: None,
            }
        } else {
            StartOutput {
                success: false,
                record,
                error: Some("storage unavailable, start not counted".to_string()),
            }
        }
    }

    pub fn format_output(&self, output: &StartOutput, options: &StartOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        match &output.error {
            Some(error) => format!("Start failed: {}", error),
            None => format!("Recorded start #{}", output.record.session_count),
        }
    }
}
