//! Relay Triage common types and errors.
//!
//! This crate provides foundational types shared across rt-core modules:
//! - Host and identity newtypes for relayed sessions
//! - Run identifiers for log correlation
//! - The unified error type with stable codes

pub mod error;
pub mod ids;

pub use error::{Error, ErrorCategory, Result};
pub use ids::{ActionName, HostAddr, Identity, RunId};
