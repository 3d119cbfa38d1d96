//! Error types for Relay Triage.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints: per-host errors are contained to that host,
//!   only total absence of session data is fatal
//!
//! Error code ranges:
//! - 10-19: Configuration errors
//! - 20-29: Session source errors
//! - 30-39: Catalog/selection errors
//! - 40-49: Action execution errors
//! - 50-59: Completion cache errors
//! - 60-69: I/O and serialization errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Relay Triage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors (policy, paths).
    Config,
    /// Session source polling/parsing errors.
    Source,
    /// Catalog navigation and target selection errors.
    Selection,
    /// Action execution errors (executor spawn, timeout).
    Action,
    /// Completion cache errors.
    Cache,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Source => write!(f, "source"),
            ErrorCategory::Selection => write!(f, "selection"),
            ErrorCategory::Action => write!(f, "action"),
            ErrorCategory::Cache => write!(f, "cache"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for Relay Triage.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    // Source errors (20-29)
    #[error("session source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("no session data: {0}")]
    NoSessionData(String),

    #[error("malformed session record: {0}")]
    MalformedRecord(String),

    // Selection errors (30-39)
    #[error("selection out of range: {index} (menu has {len} entries)")]
    OutOfRange { index: usize, len: usize },

    #[error("no valid targets in expression: {0}")]
    NoValidTargets(String),

    #[error("no privileged identity known for host {host}")]
    UnknownIdentity { host: String },

    // Action errors (40-49)
    #[error("executor failed for {host}: {reason}")]
    ExecutorFailure { host: String, reason: String },

    #[error("executor timed out after {seconds}s on host {host}")]
    ExecutorTimeout { host: String, seconds: u64 },

    #[error("no executor command configured")]
    ExecutorUnconfigured,

    // Cache errors (50-59)
    #[error("completion log locked by another process")]
    CacheLocked,

    #[error("malformed completion log line {line}")]
    MalformedLogLine { line: usize },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidPolicy(_) => 11,
            Error::SourceUnavailable(_) => 20,
            Error::NoSessionData(_) => 21,
            Error::MalformedRecord(_) => 22,
            Error::OutOfRange { .. } => 30,
            Error::NoValidTargets(_) => 31,
            Error::UnknownIdentity { .. } => 32,
            Error::ExecutorFailure { .. } => 40,
            Error::ExecutorTimeout { .. } => 41,
            Error::ExecutorUnconfigured => 42,
            Error::CacheLocked => 50,
            Error::MalformedLogLine { .. } => 51,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the category for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidPolicy(_) => ErrorCategory::Config,
            Error::SourceUnavailable(_) | Error::NoSessionData(_) | Error::MalformedRecord(_) => {
                ErrorCategory::Source
            }
            Error::OutOfRange { .. } | Error::NoValidTargets(_) | Error::UnknownIdentity { .. } => {
                ErrorCategory::Selection
            }
            Error::ExecutorFailure { .. }
            | Error::ExecutorTimeout { .. }
            | Error::ExecutorUnconfigured => ErrorCategory::Action,
            Error::CacheLocked | Error::MalformedLogLine { .. } => ErrorCategory::Cache,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Whether the operator loop can continue after this error.
    ///
    /// Per-host and per-selection errors re-prompt; only total absence of
    /// session data (and startup-time config/cache failures) are fatal.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::OutOfRange { .. }
                | Error::NoValidTargets(_)
                | Error::UnknownIdentity { .. }
                | Error::ExecutorFailure { .. }
                | Error::ExecutorTimeout { .. }
                | Error::MalformedRecord(_)
                | Error::MalformedLogLine { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_stable() {
        assert_eq!(Error::Config("x".into()).code(), 10);
        assert_eq!(Error::SourceUnavailable("x".into()).code(), 20);
        assert_eq!(Error::OutOfRange { index: 9, len: 3 }.code(), 30);
        assert_eq!(
            Error::ExecutorFailure {
                host: "h".into(),
                reason: "r".into()
            }
            .code(),
            40
        );
        assert_eq!(Error::CacheLocked.code(), 50);
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            Error::NoSessionData("empty".into()).category(),
            ErrorCategory::Source
        );
        assert_eq!(
            Error::MalformedLogLine { line: 3 }.category(),
            ErrorCategory::Cache
        );
    }

    #[test]
    fn test_per_host_errors_recoverable() {
        assert!(Error::UnknownIdentity { host: "10.0.0.5".into() }.is_recoverable());
        assert!(Error::ExecutorTimeout { host: "h".into(), seconds: 60 }.is_recoverable());
        assert!(!Error::NoSessionData("no source".into()).is_recoverable());
        assert!(!Error::CacheLocked.is_recoverable());
    }

    #[test]
    fn test_display_messages() {
        let err = Error::OutOfRange { index: 9, len: 4 };
        assert_eq!(err.to_string(), "selection out of range: 9 (menu has 4 entries)");
    }
}
