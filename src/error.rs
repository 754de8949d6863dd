//! Unified error types for pushgate with fail-safe handling.
//!
//! Nothing in the consent or delivery path is allowed to surface as a hard
//! failure to the user. Component boundaries log the error and fall back to
//! the safe answer: no prompt, no subscription, no notification.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for pushgate operations.
#[derive(Error, Debug)]
pub enum PushError {
    /// I/O errors from durable key/value storage.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Storage backend cannot be reached at all.
    #[error("storage unavailable: {message}")]
    StorageUnavailable { message: String },

    /// JSON encoding/decoding errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Platform push/notification primitive rejected a request.
    #[error("platform error: {message}")]
    Platform { message: String },

    /// A capability the operation depends on is missing.
    #[error("unsupported: {capability}")]
    Unsupported { capability: String },

    /// Remote settings API failures (transport, status, field errors).
    #[error("settings sync error: {message}")]
    Sync { message: String },

    /// Inbound push payload or worker event could not be decoded.
    #[error("invalid payload: {message}")]
    InvalidPayload { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },
}

/// A specialized Result type for pushgate operations.
pub type Result<T> = std::result::Result<T, PushError>;

impl PushError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a storage-unavailable error.
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a platform error.
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
        }
    }

    /// Create an unsupported-capability error.
    pub fn unsupported(capability: impl Into<String>) -> Self {
        Self::Unsupported {
            capability: capability.into(),
        }
    }

    /// Create a settings sync error.
    pub fn sync(message: impl Into<String>) -> Self {
        Self::Sync {
            message: message.into(),
        }
    }

    /// Create an invalid payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error means the capability is simply absent.
    ///
    /// Unsupported platforms degrade to a silent no-op and are logged at
    /// debug level rather than as warnings.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

impl From<io::Error> for PushError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for PushError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for PushError {
    fn from(err: reqwest::Error) -> Self {
        Self::Sync {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-safe error handling.
///
/// Logs the error and returns a safe default instead of propagating it.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                log_degraded(context, &err, "using default");
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                log_degraded(context, &err, "using fallback");
                fallback
            }
        }
    }
}

fn log_degraded(context: &str, err: &PushError, action: &str) {
    if err.is_unsupported() {
        tracing::debug!("{}: {} (fail-safe: {})", context, err, action);
    } else {
        tracing::warn!("{}: {} (fail-safe: {})", context, err, action);
    }
}

/// Exit codes for the pushgate CLI.
pub mod exit_codes {
    /// The command completed.
    pub const OK: i32 = 0;

    /// The command ran but reported a failure.
    pub const FAILED: i32 = 1;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}
