//! Status command for pushgate.
//!
//! Shows the stored prompt record and what the policy would decide, without
//! counting an application start.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{PermissionPromptRecord, PermissionStatus, PromptBlocker, PromptDecision, PromptPolicy};
use crate::storage::{KeyValueStore, PermissionStateStore};

/// Options for the status command.
#[derive(Debug, Clone)]
pub struct StatusOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Permission status to evaluate against.
    pub permission: PermissionStatus,
    /// Whether a user session is assumed.
    pub has_session: bool,
}

impl Default for StatusOptions {
    fn default() -> Self {
        Self {
            json: false,
            quiet: false,
            permission: PermissionStatus::Default,
            has_session: true,
        }
    }
}

/// Output format for the status command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<PermissionPromptRecord>,
    pub permission: PermissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<PromptDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusOutput {
    pub fn success(
        record: PermissionPromptRecord,
        permission: PermissionStatus,
        decision: PromptDecision,
    ) -> Self {
        Self {
            success: true,
            record: Some(record),
            permission,
            decision: Some(decision),
            error: None,
        }
    }

    pub fn failure(permission: PermissionStatus, error: impl Into<String>) -> Self {
        Self {
            success: false,
            record: None,
            permission,
            decision: None,
            error: Some(error.into()),
        }
    }
}

/// The status command implementation.
pub struct StatusCommand<S: KeyValueStore> {
    store: PermissionStateStore<S>,
    policy: PromptPolicy,
}

impl<S: KeyValueStore> StatusCommand<S> {
    pub fn new(store: S, policy: PromptPolicy) -> Self {
        Self {
            store: PermissionStateStore::new(store),
            policy,
        }
    }

    /// Run the status command at the current time.
    pub async fn run(&self, options: &StatusOptions) -> StatusOutput {
        self.run_at(options, Utc::now()).await
    }

    pub async fn run_at(&self, options: &StatusOptions, now: DateTime<Utc>) -> StatusOutput {
        match self.store.peek().await {
            Ok(record) => {
                let decision =
                    self.policy
                        .evaluate(&record, options.permission, options.has_session, now);
                StatusOutput::success(record, options.permission, decision)
            }
            Err(e) => {
                StatusOutput::failure(options.permission, format!("Failed to read record: {}", e))
            }
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StatusOutput, options: &StatusOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &StatusOutput) -> String {
        if !output.success {
            return format!(
                "Status failed: {}",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = Vec::new();
        if let Some(record) = &output.record {
            let last = record
                .last_prompt_timestamp
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string());
            lines.push("Prompt record:".to_string());
            lines.push(format!("  Sessions:    {}", record.session_count));
            lines.push(format!("  Prompts:     {}", record.prompt_count));
            lines.push(format!("  Last prompt: {}", last));
            lines.push(format!(
                "  Dismissed:   {}",
                if record.permanently_dismissed {
                    "permanently"
                } else {
                    "no"
                }
            ));
        }
        lines.push(format!("Permission:    {}", output.permission));

        if let Some(decision) = &output.decision {
            let verdict = match &decision.blocker {
                None => "prompt".to_string(),
                Some(blocker) => format!("blocked ({})", describe_blocker(blocker)),
            };
            lines.push(format!("Decision:      {}", verdict));
        }

        lines.join("\n")
    }
}

/// One-line explanation of a blocking rule.
pub fn describe_blocker(blocker: &PromptBlocker) -> String {
    match blocker {
        PromptBlocker::PermissionDecided { status } => format!("permission is {}", status),
        PromptBlocker::PermanentlyDismissed => "permanently dismissed".to_string(),
        PromptBlocker::TooFewSessions { seen, required } => {
            format!("{} of {} sessions", seen, required)
        }
        PromptBlocker::NoActiveSession => "no active session".to_string(),
        PromptBlocker::CoolingDown {
            days_since,
            required,
        } => format!("{} of {} days since last prompt", days_since, required),
        PromptBlocker::AnsweredThisSession => "already answered this session".to_string(),
    }
}
