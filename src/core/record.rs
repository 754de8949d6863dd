//! Persisted prompt history and platform permission status.
//!
//! The record only tracks prompting *behavior*. Whether permission was
//! granted or denied is always read back from the platform.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Current schema version for [`PermissionPromptRecord`].
pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// Milliseconds in one day, the unit of the prompt interval.
pub const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Prompt history for one installation.
///
/// Stored as JSON under the `notificationPromptData` key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PermissionPromptRecord {
    /// Schema version of the stored record.
    #[serde(default = "default_version")]
    pub version: u32,
    /// When the prompt was last shown. Unparseable values read as absent.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_prompt_timestamp: Option<DateTime<Utc>>,
    /// Total times the prompt was shown.
    #[serde(default)]
    pub prompt_count: u32,
    /// Application starts observed since install.
    #[serde(default)]
    pub session_count: u32,
    /// User opted out for good.
    #[serde(default)]
    pub permanently_dismissed: bool,
}

fn default_version() -> u32 {
    RECORD_SCHEMA_VERSION
}

impl Default for PermissionPromptRecord {
    fn default() -> Self {
        Self {
            version: RECORD_SCHEMA_VERSION,
            last_prompt_timestamp: None,
            prompt_count: 0,
            session_count: 0,
            permanently_dismissed: false,
        }
    }
}

impl PermissionPromptRecord {
    /// Count one application start.
    pub fn begin_session(&mut self) {
        self.session_count = self.session_count.saturating_add(1);
    }

    /// Stamp a shown prompt. `permanent` marks a never-ask-again dismissal.
    pub fn record_prompt(&mut self, now: DateTime<Utc>, permanent: bool) {
        self.last_prompt_timestamp = Some(now);
        self.prompt_count = self.prompt_count.saturating_add(1);
        if permanent {
            self.permanently_dismissed = true;
        }
    }

    /// Whole days since the last prompt, floored.
    ///
    /// Returns `None` when the prompt was never shown. A timestamp in the
    /// future yields a negative count.
    pub fn days_since_last_prompt(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_prompt_timestamp.map(|last| {
            let elapsed_ms = now.signed_duration_since(last).num_milliseconds();
            elapsed_ms.div_euclid(MS_PER_DAY)
        })
    }
}

/// Accept RFC 3339 strings or epoch milliseconds; anything else reads as absent.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let present = value.as_ref().is_some_and(|v| !v.is_null());
    let parsed = match value {
        Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    };
    if present && parsed.is_none() {
        tracing::debug!("ignoring unparseable lastPromptTimestamp");
    }
    Ok(parsed)
}

/// Notification permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    /// The user has not decided yet.
    #[default]
    Default,
    Granted,
    Denied,
    /// The platform has no notification capability.
    Unsupported,
}

impl PermissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionStatus::Default => "default",
            PermissionStatus::Granted => "granted",
            PermissionStatus::Denied => "denied",
            PermissionStatus::Unsupported => "unsupported",
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" | "prompt" => Ok(PermissionStatus::Default),
            "granted" => Ok(PermissionStatus::Granted),
            "denied" => Ok(PermissionStatus::Denied),
            "unsupported" => Ok(PermissionStatus::Unsupported),
            other => Err(format!(
                "invalid permission status: {}. Valid values: default, granted, denied, unsupported",
                other
            )),
        }
    }
}
