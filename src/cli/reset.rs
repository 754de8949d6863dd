//! Reset command for pushgate.
//!
//! Removes the prompt record and the sync ledger.

use serde::{Deserialize, Serialize};

use crate::storage::{KeyValueStore, PermissionStateStore};
use crate::sync::SyncLedger;

/// Options for the reset command.
#[derive(Debug, Clone, Default)]
pub struct ResetOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Output format for the reset command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The reset command implementation.
pub struct ResetCommand<S: KeyValueStore + Clone> {
    store: S,
}

impl<S: KeyValueStore + Clone> ResetCommand<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn run(&self) -> ResetOutput {
        let prompts = PermissionStateStore::new(self.store.clone());
        let ledger = SyncLedger::new(self.store.clone());

        let result = match prompts.reset().await {
            Ok(()) => ledger.clear().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => ResetOutput {
                success: true,
                error: None,
            },
            Err(e) => ResetOutput {
                success: false,
                error: Some(format!("Failed to reset: {}", e)),
            },
        }
    }

    pub fn format_output(&self, output: &ResetOutput, options: &ResetOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        match &output.error {
            Some(error) => format!("Reset failed: {}", error),
            None => "Prompt history reset".to_string(),
        }
    }
}
