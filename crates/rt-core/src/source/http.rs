//! HTTP polling source.
//!
//! Polls an endpoint that serves the relay tool's session table as a JSON
//! array of 4-field string records: `[_, host, identity, "TRUE"/"FALSE"]`.
//! The first field is source-owned and ignored here. Records that do not
//! adapt to (host, identity, privileged) are skipped, not fatal.

use super::SessionSource;
use crate::store::SessionRecord;
use rt_common::{Error, HostAddr, Identity, Result};
use std::time::Duration;
use tracing::{debug, warn};

/// Default request timeout.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Session source backed by an HTTP endpoint.
pub struct HttpSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_HTTP_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::SourceUnavailable(format!("http client: {e}")))?;
        Ok(HttpSource {
            url: url.into(),
            client,
        })
    }
}

impl SessionSource for HttpSource {
    fn poll(&self) -> Result<Vec<SessionRecord>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| Error::SourceUnavailable(format!("{}: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::SourceUnavailable(format!(
                "{}: HTTP {}",
                self.url,
                response.status()
            )));
        }

        let rows: Vec<Vec<String>> = response
            .json()
            .map_err(|e| Error::MalformedRecord(format!("{}: {}", self.url, e)))?;

        let mut records = Vec::new();
        for (row_num, row) in rows.iter().enumerate() {
            match adapt_row(row) {
                Some(record) => records.push(record),
                None => {
                    warn!(url = %self.url, row = row_num, "skipping unadaptable session row");
                }
            }
        }

        debug!(url = %self.url, records = records.len(), "polled session endpoint");
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("http:{}", self.url)
    }
}

/// Adapt one 4-field row to a session record.
fn adapt_row(row: &[String]) -> Option<SessionRecord> {
    if row.len() < 4 {
        return None;
    }
    let host = HostAddr::parse(&row[1])?;
    let identity = Identity::parse(&row[2])?;
    let privileged = match row[3].as_str() {
        "TRUE" => true,
        "FALSE" => false,
        _ => return None,
    };
    Some(SessionRecord::new(host, identity, privileged))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_adapt_privileged_row() {
        let record = adapt_row(&row(&["SMB", "10.0.0.5", "CORP/alice", "TRUE"])).unwrap();
        assert_eq!(record.host.as_str(), "10.0.0.5");
        assert_eq!(record.identity.as_str(), "CORP/alice");
        assert!(record.privileged);
    }

    #[test]
    fn test_adapt_unprivileged_row() {
        let record = adapt_row(&row(&["SMB", "10.0.0.6", "CORP/bob", "FALSE"])).unwrap();
        assert!(!record.privileged);
    }

    #[test]
    fn test_adapt_rejects_short_or_odd_rows() {
        assert!(adapt_row(&row(&["SMB", "10.0.0.5", "CORP/alice"])).is_none());
        assert!(adapt_row(&row(&["SMB", "10.0.0.5", "CORP/alice", "maybe"])).is_none());
        assert!(adapt_row(&row(&["SMB", "", "CORP/alice", "TRUE"])).is_none());
    }

    #[test]
    fn test_unreachable_endpoint_is_source_unavailable() {
        // Reserved TEST-NET-1 address; connection fails fast with the short timeout.
        let source =
            HttpSource::with_timeout("http://192.0.2.1:1/sessions", Duration::from_millis(200))
                .unwrap();
        assert!(matches!(source.poll(), Err(Error::SourceUnavailable(_))));
    }
}
