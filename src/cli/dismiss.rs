//! Dismiss command for pushgate.
//!
//! Stamps the prompt record as if the user dismissed the prompt.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::{PermissionPromptRecord, PromptResponse};
use crate::storage::{KeyValueStore, PermissionStateStore};

/// Options for the dismiss command.
#[derive(Debug, Clone, Default)]
pub struct DismissOptions {
    pub json: bool,
    pub quiet: bool,
    /// Never prompt again.
    pub permanent: bool,
}

/// Output format for the dismiss command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DismissOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<PermissionPromptRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DismissOutput {
    fn failure(error: String) -> Self {
        Self {
            success: false,
            record: None,
            error: Some(error),
        }
    }
}

/// The dismiss command implementation.
pub struct DismissCommand<S: KeyValueStore> {
    store: PermissionStateStore<S>,
}

impl<S: KeyValueStore> DismissCommand<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: PermissionStateStore::new(store),
        }
    }

    pub async fn run(&self, options: &DismissOptions) -> DismissOutput {
        let mut record = match self.store.peek().await {
            Ok(record) => record,
            Err(e) => return DismissOutput::failure(format!("Failed to read record: {}", e)),
        };

        let response = if options.permanent {
            PromptResponse::DismissPermanently
        } else {
            PromptResponse::Dismiss
        };
        response.apply(&mut record, Utc::now());

        match self.store.write(&record).await {
            Ok(()) => DismissOutput {
                success: true,
                record: Some(record),
                error: None,
            },
            Err(e) => DismissOutput::failure(format!("Failed to write record: {}", e)),
        }
    }

    pub fn format_output(&self, output: &DismissOutput, options: &DismissOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        match (&output.record, &output.error) {
            (Some(record), _) if record.permanently_dismissed => {
                "Prompt dismissed permanently".to_string()
            }
            (Some(record), _) => format!("Prompt dismissed ({} total)", record.prompt_count),
            (None, error) => format!(
                "Dismiss failed: {}",
                error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyValueStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_soft_dismiss_stamps_record() {
        let backing = Arc::new(MemoryKeyValueStore::new());
        let cmd = DismissCommand::new(Arc::clone(&backing));

        let output = cmd.run(&DismissOptions::default()).await;

        let record = output.record.unwrap();
        assert_eq!(record.prompt_count, 1);
        assert!(record.last_prompt_timestamp.is_some());
        assert!(!record.permanently_dismissed);

        let stored = PermissionStateStore::new(backing).peek().await.unwrap();
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn test_permanent_dismiss_sets_flag() {
        let cmd = DismissCommand::new(MemoryKeyValueStore::new());
        let options = DismissOptions {
            permanent: true,
            ..Default::default()
        };

        let output = cmd.run(&options).await;

        assert!(output.record.as_ref().unwrap().permanently_dismissed);
        assert_eq!(
            cmd.format_output(&output, &options),
            "Prompt dismissed permanently"
        );
    }

    #[tokio::test]
    async fn test_dismiss_does_not_count_session() {
        let cmd = DismissCommand::new(MemoryKeyValueStore::new());

        let output = cmd.run(&DismissOptions::default()).await;

        assert_eq!(output.record.unwrap().session_count, 0);
    }

    #[tokio::test]
    async fn test_dismiss_storage_failure() {
        let cmd = DismissCommand::new(MemoryKeyValueStore::unavailable());

        let output = cmd.run(&DismissOptions::default()).await;

        assert!(!output.success);
        assert!(cmd
            .format_output(&output, &DismissOptions::default())
            .contains("Dismiss failed"));
    }
}
