//! Relay tool output file source.
//!
//! The relay tool writes one whitespace-delimited line per session. A
//! line qualifies if its fourth field is the literal `TRUE`; field 1 is
//! the host, field 2 the identity, and privilege is implied true by the
//! `TRUE` filter itself. Everything else (headers, partial lines, other
//! flag values) is ignored.

use super::SessionSource;
use crate::store::SessionRecord;
use rt_common::{Error, HostAddr, Identity, Result};
use std::path::PathBuf;
use tracing::{debug, warn};

/// The qualifying flag value, matched exactly.
const PRIVILEGED_FLAG: &str = "TRUE";

/// Session source backed by the relay tool's output file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }
}

impl SessionSource for FileSource {
    fn poll(&self) -> Result<Vec<SessionRecord>> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::SourceUnavailable(format!("{}: {}", self.path.display(), e))
        })?;

        let mut records = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 || fields[3] != PRIVILEGED_FLAG {
                continue;
            }
            match (HostAddr::parse(fields[1]), Identity::parse(fields[2])) {
                (Some(host), Some(identity)) => {
                    records.push(SessionRecord::new(host, identity, true));
                }
                _ => {
                    warn!(
                        path = %self.path.display(),
                        line = line_num + 1,
                        "skipping unparsable session line"
                    );
                }
            }
        }

        debug!(
            path = %self.path.display(),
            records = records.len(),
            "polled session file"
        );
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_source(content: &str) -> (TempDir, FileSource) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("socks.txt");
        std::fs::write(&path, content).unwrap();
        (tmp, FileSource::new(path))
    }

    #[test]
    fn test_qualifying_lines_only() {
        let (_tmp, source) = write_source(
            "SMB 10.0.0.5 CORP/alice TRUE\n\
             SMB 10.0.0.6 CORP/bob FALSE\n\
             SMB 10.0.0.7 CORP/carol TRUE\n",
        );
        let records = source.poll().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].host.as_str(), "10.0.0.5");
        assert_eq!(records[0].identity.as_str(), "CORP/alice");
        assert!(records[0].privileged);
        assert_eq!(records[1].host.as_str(), "10.0.0.7");
    }

    #[test]
    fn test_flag_is_case_sensitive() {
        let (_tmp, source) = write_source("SMB 10.0.0.5 CORP/alice true\n");
        assert!(source.poll().unwrap().is_empty());
    }

    #[test]
    fn test_short_lines_skipped() {
        let (_tmp, source) = write_source(
            "Protocol Target Username AdminStatus\n\
             SMB 10.0.0.5\n\
             \n\
             SMB 10.0.0.6 CORP/bob TRUE\n",
        );
        let records = source.poll().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].host.as_str(), "10.0.0.6");
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let source = FileSource::new("/nonexistent/socks.txt");
        assert!(matches!(source.poll(), Err(Error::SourceUnavailable(_))));
    }
}
