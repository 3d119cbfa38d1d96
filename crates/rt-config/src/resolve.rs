//! Configuration and state path resolution.
//!
//! Resolution order: CLI arguments → environment variables → XDG paths → defaults.

use crate::policy::Policy;
use rt_common::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable names.
const ENV_CONFIG_PATH: &str = "RT_CONFIG";
const ENV_CACHE_PATH: &str = "RT_CACHE";

/// Standard file names.
const CONFIG_FILENAME: &str = "config.toml";
const CACHE_FILENAME: &str = "cache.txt";

/// Application name for XDG directories.
const APP_NAME: &str = "relay-triage";

/// Where a resolved path came from (for diagnostics).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,
    /// Set via environment variable.
    Environment,
    /// Found in (or placed under) the XDG directory.
    XdgPath,
    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgPath => write!(f, "XDG path"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Resolve the config file path, if any config file exists.
///
/// Order: CLI path (must exist, error otherwise) → `RT_CONFIG` →
/// `~/.config/relay-triage/config.toml` → none (builtin defaults).
pub fn resolve_config_path(cli: Option<&Path>) -> Result<Option<(PathBuf, ConfigSource)>> {
    if let Some(path) = cli {
        if !path.exists() {
            return Err(Error::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return Ok(Some((path.to_path_buf(), ConfigSource::CliArgument)));
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(Some((path, ConfigSource::Environment)));
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join(APP_NAME).join(CONFIG_FILENAME);
        if path.exists() {
            return Ok(Some((path, ConfigSource::XdgPath)));
        }
    }

    Ok(None)
}

/// Resolve the completion log path.
///
/// Order: CLI path → `RT_CACHE` → XDG state directory → `cache.txt` in the
/// working directory (matching the original tool's behavior when no state
/// directory is available).
pub fn resolve_cache_path(cli: Option<&Path>) -> (PathBuf, ConfigSource) {
    if let Some(path) = cli {
        return (path.to_path_buf(), ConfigSource::CliArgument);
    }

    if let Ok(env_path) = std::env::var(ENV_CACHE_PATH) {
        return (PathBuf::from(env_path), ConfigSource::Environment);
    }

    if let Some(state_dir) = dirs::state_dir().or_else(dirs::data_local_dir) {
        return (
            state_dir.join(APP_NAME).join(CACHE_FILENAME),
            ConfigSource::XdgPath,
        );
    }

    (PathBuf::from(CACHE_FILENAME), ConfigSource::BuiltinDefault)
}

/// Load and validate the policy from the resolved config file.
///
/// A missing config file yields the default policy; a present but
/// malformed file is an error (silent fallback would mask typos).
pub fn load_policy(cli_config: Option<&Path>) -> Result<Policy> {
    let policy = match resolve_config_path(cli_config)? {
        Some((path, _source)) => {
            let text = std::fs::read_to_string(&path)?;
            toml::from_str(&text)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?
        }
        None => Policy::default(),
    };
    policy.validate()?;
    Ok(policy)
}
