//! Session source collaborators.
//!
//! A source returns the current list of relayed sessions; the store does
//! the reconciliation. Two adapters ship: the relay tool's output file
//! and an HTTP endpoint serving the same records as JSON. Sources are
//! tried in order; only total failure of every source is fatal.

mod file;
mod http;

pub use file::FileSource;
pub use http::HttpSource;

use crate::store::SessionRecord;
use rt_common::{Error, Result};
use tracing::warn;

/// A pollable provider of session records.
pub trait SessionSource {
    /// Fetch the current session list. Transient failure is an error;
    /// an empty list is a valid (if unhelpful) answer.
    fn poll(&self) -> Result<Vec<SessionRecord>>;

    /// Human-readable description for logs and warnings.
    fn describe(&self) -> String;
}

/// Ordered fallback chain over sources.
pub struct SourceChain {
    sources: Vec<Box<dyn SessionSource>>,
}

impl SourceChain {
    pub fn new(sources: Vec<Box<dyn SessionSource>>) -> Self {
        SourceChain { sources }
    }

    /// Poll sources in order, returning the first successful result.
    ///
    /// Failures short of the last source are demoted to warnings; if every
    /// source fails, the last error is surfaced as `NoSessionData`.
    pub fn poll(&self) -> Result<Vec<SessionRecord>> {
        let mut last_err: Option<Error> = None;
        for source in &self.sources {
            match source.poll() {
                Ok(records) => return Ok(records),
                Err(err) => {
                    warn!(source = %source.describe(), error = %err, "session source failed");
                    last_err = Some(err);
                }
            }
        }
        Err(Error::NoSessionData(match last_err {
            Some(err) => format!("all sources failed, last error: {err}"),
            None => "no session source configured".to_string(),
        }))
    }
}

impl SessionSource for SourceChain {
    fn poll(&self) -> Result<Vec<SessionRecord>> {
        SourceChain::poll(self)
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.sources.iter().map(|s| s.describe()).collect();
        format!("chain[{}]", parts.join(" -> "))
    }
}
