//! Operator policy for batch execution.
//!
//! The policy controls the knobs the spec leaves to the operator: whether
//! failed attempts count toward completion, the per-host executor timeout,
//! and when a batch asks for confirmation.

use rt_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default per-host executor timeout in seconds.
pub const DEFAULT_EXECUTOR_TIMEOUT_SECS: u64 = 60;

/// Default minimum target count that triggers a confirmation prompt.
pub const DEFAULT_CONFIRM_THRESHOLD: usize = 2;

/// Execution policy loaded from config.toml.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Policy {
    /// Record a host as attempted even when the executor fails or times
    /// out. Matches the historically observed behavior; set to false to
    /// record successes only.
    pub record_failures: bool,

    /// Per-host executor timeout in seconds. A host that exceeds this is
    /// recorded as timed out and the batch continues.
    pub executor_timeout_secs: u64,

    /// Ask for confirmation when a batch targets at least this many hosts.
    pub confirm_threshold: usize,

    /// External command template for the action executor. Placeholders
    /// `{host}`, `{identity}`, and `{action}` are substituted per host.
    /// When unset, dispatch refuses to run (the console still navigates
    /// and reports status).
    pub executor_command: Option<String>,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            record_failures: true,
            executor_timeout_secs: DEFAULT_EXECUTOR_TIMEOUT_SECS,
            confirm_threshold: DEFAULT_CONFIRM_THRESHOLD,
            executor_command: None,
        }
    }
}

impl Policy {
    /// Semantic validation beyond what serde enforces.
    pub fn validate(&self) -> Result<()> {
        if self.executor_timeout_secs == 0 {
            return Err(Error::InvalidPolicy(
                "executor_timeout_secs must be positive".to_string(),
            ));
        }
        if self.confirm_threshold == 0 {
            return Err(Error::InvalidPolicy(
                "confirm_threshold must be at least 1".to_string(),
            ));
        }
        if let Some(cmd) = &self.executor_command {
            if cmd.trim().is_empty() {
                return Err(Error::InvalidPolicy(
                    "executor_command must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_valid() {
        let policy = Policy::default();
        assert!(policy.validate().is_ok());
        assert!(policy.record_failures);
        assert_eq!(policy.executor_timeout_secs, 60);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let policy = Policy {
            executor_timeout_secs: 0,
            ..Policy::default()
        };
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("executor_timeout_secs"));
    }

    #[test]
    fn test_blank_command_rejected() {
        let policy = Policy {
            executor_command: Some("   ".to_string()),
            ..Policy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let policy = Policy {
            record_failures: false,
            executor_timeout_secs: 30,
            confirm_threshold: 3,
            executor_command: Some("echo {action} {host} {identity}".to_string()),
        };
        let text = toml::to_string(&policy).unwrap();
        let back: Policy = toml::from_str(&text).unwrap();
        assert_eq!(back, policy);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let policy: Policy = toml::from_str("record_failures = false\n").unwrap();
        assert!(!policy.record_failures);
        assert_eq!(policy.executor_timeout_secs, DEFAULT_EXECUTOR_TIMEOUT_SECS);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: std::result::Result<Policy, _> = toml::from_str("no_such_knob = true\n");
        assert!(result.is_err());
    }
}
