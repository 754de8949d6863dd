//! Worker command for pushgate.
//!
//! Runs one worker event through the delivery handler against a recording
//! host and reports what the platform was asked to do.
//!
//! Input is the event JSON. An optional `clients` array describes the open
//! windows the host should report.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::WorkerConfig;
use crate::core::PermissionStatus;
use crate::error::{PushError, Result};
use crate::platform::{HostAction, RecordingWorkerHost};
use crate::worker::{BackgroundDeliveryHandler, EventKind, EventOutcome, WindowClient, WorkerEvent};

/// Options for the worker command.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub quiet: bool,
    /// Notification permission the host reports.
    pub permission: PermissionStatus,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            quiet: false,
            permission: PermissionStatus::Granted,
        }
    }
}

/// Output format for the worker command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerOutput {
    pub success: bool,
    pub event: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<EventOutcome>,
    pub actions: Vec<HostAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The worker command implementation.
pub struct WorkerCommand {
    defaults: WorkerConfig,
}

impl WorkerCommand {
    pub fn new(defaults: WorkerConfig) -> Self {
        Self { defaults }
    }

    pub async fn run(&self, kind: EventKind, input: &str, options: &WorkerOptions) -> WorkerOutput {
        let (event, clients) = match parse_input(kind, input) {
            Ok(parsed) => parsed,
            Err(e) => {
                return WorkerOutput {
                    success: false,
                    event: kind,
                    outcome: None,
                    actions: vec![],
                    error: Some(format!("Invalid event: {}", e)),
                }
            }
        };

        let host = Arc::new(
            RecordingWorkerHost::new()
                .with_permission(options.permission)
                .with_clients(clients),
        );
        let handler = BackgroundDeliveryHandler::new(Arc::clone(&host), self.defaults.clone());
        let outcome = handler.dispatch(event).await;

        WorkerOutput {
            success: true,
            event: kind,
            outcome: Some(outcome),
            actions: host.actions(),
            error: None,
        }
    }

    /// Worker output is always JSON.
    pub fn format_output(&self, output: &WorkerOutput, options: &WorkerOptions) -> String {
        if options.quiet {
            return String::new();
        }
        serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
    }
}

fn parse_input(kind: EventKind, input: &str) -> Result<(WorkerEvent, Vec<WindowClient>)> {
    let mut value: Value =
        serde_json::from_str(input).map_err(|e| PushError::invalid_payload(e.to_string()))?;

    let clients = match value.as_object_mut().and_then(|o| o.remove("clients")) {
        Some(raw) => serde_json::from_value(raw)
            .map_err(|e| PushError::invalid_payload(format!("invalid clients: {}", e)))?,
        None => Vec::new(),
    };

    let event = WorkerEvent::parse_as(kind, &value.to_string())?;
    Ok((event, clients))
}
