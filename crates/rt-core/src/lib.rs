//! Relay Triage Core - Session Reconciliation and Action Dispatch
//!
//! The engine behind the `rt` console:
//! - Session source polling (relay tool output file or HTTP endpoint)
//! - Reconciliation of polled records into the in-memory working set
//! - The durable completion cache (which action ran on which host)
//! - The fixed action catalog and its navigation
//! - The sequential batch execution controller

pub mod cache;
pub mod catalog;
pub mod dispatch;
pub mod exit_codes;
pub mod input;
pub mod logging;
pub mod menu;
pub mod source;
pub mod store;
