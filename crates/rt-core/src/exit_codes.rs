//! Exit codes for the rt CLI.
//!
//! Exit codes communicate run outcome without output parsing.
//!
//! Ranges:
//! - 0-6: Operational outcomes
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

/// Exit codes for rt operations.
///
/// These codes are a stable contract for wrappers and scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Clean run: console exited normally, nothing dispatched or all
    /// dispatches succeeded.
    Clean = 0,

    /// At least one dispatch ran and every attempt succeeded.
    ActionsOk = 1,

    /// At least one per-host attempt failed or timed out.
    PartialFail = 3,

    /// Invalid arguments (no source configured, bad flag values).
    ArgsError = 10,

    /// No session data: every configured source failed.
    NoSessionData = 15,

    /// Completion log held by another console.
    LockError = 16,

    /// Internal error (bug - please report).
    InternalError = 20,

    /// I/O error.
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Operational outcomes are not errors (codes 0-6).
    pub fn is_operational(self) -> bool {
        (self as i32) < 10
    }

    /// User/environment errors (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Error code name for log output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::ActionsOk => "OK_APPLIED",
            ExitCode::PartialFail => "ERR_PARTIAL",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::NoSessionData => "ERR_NO_SESSIONS",
            ExitCode::LockError => "ERR_LOCK",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_values_stable() {
        assert_eq!(ExitCode::Clean.as_i32(), 0);
        assert_eq!(ExitCode::PartialFail.as_i32(), 3);
        assert_eq!(ExitCode::ArgsError.as_i32(), 10);
        assert_eq!(ExitCode::NoSessionData.as_i32(), 15);
    }

    #[test]
    fn test_classification() {
        assert!(ExitCode::ActionsOk.is_operational());
        assert!(ExitCode::NoSessionData.is_user_error());
        assert!(!ExitCode::InternalError.is_user_error());
    }
}
