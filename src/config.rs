//! Configuration loading for pushgate.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.pushgate/config.toml`)
//! 3. User config (`~/.pushgate/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. Without a VAPID public key the push
//! subsystem reports itself unsupported and never prompts.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PushError, Result};

/// Main configuration struct for pushgate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Permission prompt throttling.
    pub prompt: PromptConfig,
    /// Push subscription and settings sync.
    pub push: PushConfig,
    /// Background worker notification defaults.
    pub worker: WorkerConfig,
}

/// Permission prompt throttling configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PromptConfig {
    /// Application starts required before the first prompt.
    pub min_session_count: u32,
    /// Whole days that must pass between two prompts.
    pub interval_days: u32,
}

/// Minimum valid `min_session_count` (a prompt on the very first start is never allowed).
pub const MIN_MIN_SESSION_COUNT: u32 = 1;

impl PromptConfig {
    /// Check if a session threshold is valid (must be >= 1).
    pub fn is_valid_min_session_count(value: u32) -> bool {
        value >= MIN_MIN_SESSION_COUNT
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            min_session_count: 2,
            interval_days: 2,
        }
    }
}

/// Push subscription configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PushConfig {
    /// URL-safe base64 VAPID public key. Absent disables the subsystem.
    pub vapid_public_key: Option<String>,
    /// GraphQL endpoint receiving settings updates.
    pub settings_url: String,
    /// Timeout for a single settings request.
    pub request_timeout_seconds: u32,
}

/// Minimum valid request timeout.
pub const MIN_REQUEST_TIMEOUT_SECONDS: u32 = 1;

impl PushConfig {
    /// Whether a non-empty public key is configured.
    pub fn has_public_key(&self) -> bool {
        self.vapid_public_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    /// Check that a settings URL is an absolute http(s) URL.
    pub fn is_valid_settings_url(value: &str) -> bool {
        url::Url::parse(value)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false)
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            vapid_public_key: None,
            settings_url: "http://localhost:4000/graphql".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

/// Defaults applied to inbound notifications that omit optional fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    pub default_icon: String,
    pub default_badge: String,
    pub default_sound: String,
    /// Tag used when a payload carries none.
    pub default_tag: String,
    /// Vibration pattern in milliseconds.
    pub vibrate: Vec<u32>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            default_icon: "/icons/icon-192x192.png".to_string(),
            default_badge: "/icons/icon-72x72.png".to_string(),
            default_sound: "/sounds/notification.mp3".to_string(),
            default_tag: "daylybread-notification".to_string(),
            vibrate: vec![200, 100, 200],
        }
    }
}

impl Config {
    /// Load configuration with full precedence chain from the current directory.
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `<home>/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = pushgate_home()?;
        Self::load_from_file(&home.join("config.toml")).ok()
    }

    /// Load project config from `.pushgate/config.toml` in the given directory.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        let config_path = cwd.join(".pushgate").join("config.toml");
        Self::load_from_file(&config_path).ok()
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| PushError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| PushError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // PUSHGATE_MIN_SESSION_COUNT
        if let Ok(val) = env::var("PUSHGATE_MIN_SESSION_COUNT") {
            match val.parse::<u32>() {
                Ok(n) if PromptConfig::is_valid_min_session_count(n) => {
                    self.prompt.min_session_count = n;
                }
                _ => tracing::warn!(
                    value = %val,
                    default = self.prompt.min_session_count,
                    "Invalid PUSHGATE_MIN_SESSION_COUNT, expected an integer >= {}",
                    MIN_MIN_SESSION_COUNT
                ),
            }
        }

        // PUSHGATE_PROMPT_INTERVAL_DAYS
        if let Ok(val) = env::var("PUSHGATE_PROMPT_INTERVAL_DAYS") {
            match val.parse::<u32>() {
                Ok(n) => self.prompt.interval_days = n,
                Err(_) => tracing::warn!(
                    value = %val,
                    default = self.prompt.interval_days,
                    "Invalid PUSHGATE_PROMPT_INTERVAL_DAYS, expected a non-negative integer"
                ),
            }
        }

        // PUSHGATE_VAPID_PUBLIC_KEY
        if let Ok(val) = env::var("PUSHGATE_VAPID_PUBLIC_KEY") {
            let trimmed = val.trim();
            self.push.vapid_public_key = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }

        // PUSHGATE_SETTINGS_URL
        if let Ok(val) = env::var("PUSHGATE_SETTINGS_URL") {
            if PushConfig::is_valid_settings_url(&val) {
                self.push.settings_url = val;
            } else {
                tracing::warn!(
                    value = %val,
                    default = %self.push.settings_url,
                    "Invalid PUSHGATE_SETTINGS_URL, expected an http(s) URL"
                );
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// Field-by-field: every non-default value in `other` wins. A layer cannot
    /// set a value back to its default once a lower layer changed it.
    fn merge(mut self, other: Config) -> Self {
        let default_prompt = PromptConfig::default();
        if other.prompt.min_session_count != default_prompt.min_session_count
            && PromptConfig::is_valid_min_session_count(other.prompt.min_session_count)
        {
            self.prompt.min_session_count = other.prompt.min_session_count;
        }
        if other.prompt.interval_days != default_prompt.interval_days {
            self.prompt.interval_days = other.prompt.interval_days;
        }

        let default_push = PushConfig::default();
        if other.push.vapid_public_key.is_some() {
            self.push.vapid_public_key = other.push.vapid_public_key;
        }
        if other.push.settings_url != default_push.settings_url {
            self.push.settings_url = other.push.settings_url;
        }
        if other.push.request_timeout_seconds != default_push.request_timeout_seconds
            && other.push.request_timeout_seconds >= MIN_REQUEST_TIMEOUT_SECONDS
        {
            self.push.request_timeout_seconds = other.push.request_timeout_seconds;
        }

        let default_worker = WorkerConfig::default();
        if other.worker.default_icon != default_worker.default_icon {
            self.worker.default_icon = other.worker.default_icon;
        }
        if other.worker.default_badge != default_worker.default_badge {
            self.worker.default_badge = other.worker.default_badge;
        }
        if other.worker.default_sound != default_worker.default_sound {
            self.worker.default_sound = other.worker.default_sound;
        }
        if other.worker.default_tag != default_worker.default_tag {
            self.worker.default_tag = other.worker.default_tag;
        }
        if other.worker.vibrate != default_worker.vibrate {
            self.worker.vibrate = other.worker.vibrate;
        }

        self
    }

    /// Load config, never failing.
    pub fn load_fail_open() -> Self {
        Self::load()
    }
}

/// Get the pushgate home directory.
///
/// Checks `PUSHGATE_HOME` first, then falls back to `~/.pushgate`.
pub fn pushgate_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("PUSHGATE_HOME") {
        if home.is_empty() {
            tracing::warn!("PUSHGATE_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("PUSHGATE_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".pushgate"));
    }

    let fallback_path = fallback_pushgate_home();
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

#[cfg(unix)]
fn fallback_pushgate_home() -> PathBuf {
    use std::os::unix::fs::MetadataExt;
    let uid = std::fs::metadata("/").map(|m| m.uid()).unwrap_or(0);
    PathBuf::from(format!("/tmp/pushgate-{}", uid))
}

#[cfg(not(unix))]
fn fallback_pushgate_home() -> PathBuf {
    std::env::temp_dir().join("pushgate")
}

/// Directory holding the local key/value entries.
///
/// Returns `<home>/storage/`.
pub fn storage_dir() -> Option<PathBuf> {
    pushgate_home().map(|h| h.join("storage"))
}
