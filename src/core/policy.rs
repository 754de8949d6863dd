//! Prompt policy for notification permission requests.
//!
//! The decision is a pure function of the stored record, the platform
//! permission status, the session signal and the current time. Nothing here
//! touches storage; the engine persists whatever the policy decides.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PromptConfig;
use crate::core::record::{PermissionPromptRecord, PermissionStatus};

/// Throttling thresholds for the permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptPolicy {
    /// Application starts required before the first prompt.
    pub min_session_count: u32,
    /// Whole days required between prompts.
    pub interval_days: u32,
}

impl Default for PromptPolicy {
    fn default() -> Self {
        Self::from_config(&PromptConfig::default())
    }
}

impl PromptPolicy {
    pub fn new(min_session_count: u32, interval_days: u32) -> Self {
        Self {
            min_session_count,
            interval_days,
        }
    }

    pub fn from_config(config: &PromptConfig) -> Self {
        Self::new(config.min_session_count, config.interval_days)
    }

    /// Whether the prompt should be shown now.
    pub fn should_prompt(
        &self,
        record: &PermissionPromptRecord,
        status: PermissionStatus,
        has_active_session: bool,
        now: DateTime<Utc>,
    ) -> bool {
        self.blocker(record, status, has_active_session, now).is_none()
    }

    /// Evaluate the policy and report the first rule that blocks the prompt.
    pub fn evaluate(
        &self,
        record: &PermissionPromptRecord,
        status: PermissionStatus,
        has_active_session: bool,
        now: DateTime<Utc>,
    ) -> PromptDecision {
        match self.blocker(record, status, has_active_session, now) {
            None => PromptDecision::prompt(),
            Some(blocker) => PromptDecision::blocked(blocker),
        }
    }

    fn blocker(
        &self,
        record: &PermissionPromptRecord,
        status: PermissionStatus,
        has_active_session: bool,
        now: DateTime<Utc>,
    ) -> Option<PromptBlocker> {
        if status != PermissionStatus::Default {
            return Some(PromptBlocker::PermissionDecided { status });
        }

        if record.permanently_dismissed {
            return Some(PromptBlocker::PermanentlyDismissed);
        }

        if record.session_count < self.min_session_count {
            return Some(PromptBlocker::TooFewSessions {
                seen: record.session_count,
                required: self.min_session_count,
            });
        }

        if !has_active_session {
            return Some(PromptBlocker::NoActiveSession);
        }

        if let Some(days) = record.days_since_last_prompt(now) {
            if days < i64::from(self.interval_days) {
                return Some(PromptBlocker::CoolingDown {
                    days_since: days,
                    required: self.interval_days,
                });
            }
        }

        None
    }
}

/// Why the prompt is not shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PromptBlocker {
    /// Platform status is granted, denied or unsupported.
    PermissionDecided { status: PermissionStatus },
    /// User asked never to be prompted again.
    PermanentlyDismissed,
    /// Not enough application starts yet.
    TooFewSessions { seen: u32, required: u32 },
    /// No logical user session exists.
    NoActiveSession,
    /// Last prompt is too recent.
    CoolingDown { days_since: i64, required: u32 },
    /// The prompt was already answered in this session.
    AnsweredThisSession,
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDecision {
    pub should_prompt: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocker: Option<PromptBlocker>,
}

impl PromptDecision {
    pub fn prompt() -> Self {
        Self {
            should_prompt: true,
            blocker: None,
        }
    }

    pub fn blocked(blocker: PromptBlocker) -> Self {
        Self {
            should_prompt: false,
            blocker: Some(blocker),
        }
    }
}

impl Default for PromptDecision {
    /// Nothing evaluated yet: do not prompt.
    fn default() -> Self {
        Self::blocked(PromptBlocker::TooFewSessions {
            seen: 0,
            required: PromptPolicy::default().min_session_count,
        })
    }
}

/// The user's answer to a shown prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptResponse {
    /// User agreed; subscription is attempted.
    Accept,
    /// "Not now": eligible again after the interval.
    Dismiss,
    /// "Never": no further prompts until reset.
    DismissPermanently,
}

impl PromptResponse {
    /// Apply the response to the prompt history.
    ///
    /// Every response stamps the prompt; only a permanent dismissal sets the
    /// opt-out flag.
    pub fn apply(self, record: &mut PermissionPromptRecord, now: DateTime<Utc>) {
        record.record_prompt(now, self == PromptResponse::DismissPermanently);
    }
}
