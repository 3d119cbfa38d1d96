//! Relay Triage configuration loading and validation.
//!
//! This crate provides:
//! - The typed `Policy` struct for config.toml
//! - Path resolution (CLI → env → XDG → defaults) for the config file
//!   and the completion log
//! - Semantic validation with field context

pub mod policy;
pub mod resolve;

pub use policy::Policy;
pub use resolve::{resolve_cache_path, resolve_config_path, load_policy, ConfigSource};
