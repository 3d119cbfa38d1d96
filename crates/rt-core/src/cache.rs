//! Durable completion cache.
//!
//! An append-only text log records which action has been run on which
//! host, one line per event:
//!
//! ```text
//! Action: List shares on 10.0.0.5
//! ```
//!
//! The log is replayed on open; malformed lines are skipped with a
//! warning so a newer format never bricks an older console. It is never
//! rewritten wholesale (crash-during-write leaves at most one torn final
//! line, which replay skips), and a non-blocking advisory flock keeps a
//! second console in the same run from interleaving writes.
//!
//! Completion status is always derived live against the current
//! privileged host set: a previously complete action regresses to partial
//! the moment a new privileged host appears. That is the point.

use rt_common::{ActionName, Error, HostAddr, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Prefix of every completion log line.
const LINE_PREFIX: &str = "Action: ";

/// Separator between action name and host. Split from the right so action
/// names containing " on " still parse.
const LINE_SEPARATOR: &str = " on ";

/// Coverage of one action against the current privileged host set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// No host recorded for this action.
    None,
    /// Some hosts recorded, but not all currently privileged ones.
    Partial,
    /// Every currently privileged host is recorded (both sets non-empty).
    Complete,
}

impl std::fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionStatus::None => write!(f, "none"),
            CompletionStatus::Partial => write!(f, "partial"),
            CompletionStatus::Complete => write!(f, "complete"),
        }
    }
}

/// Append-only completion cache with an in-memory replay.
pub struct CompletionCache {
    /// Durable log path; `None` for a purely in-memory cache.
    path: Option<PathBuf>,
    /// Replayed state: action → set of hosts attempted.
    completed: HashMap<ActionName, BTreeSet<HostAddr>>,
    /// Open appender. Held for the life of the cache; also carries the
    /// advisory lock.
    writer: Option<BufWriter<File>>,
}

impl std::fmt::Debug for CompletionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionCache")
            .field("path", &self.path)
            .field("actions", &self.completed.len())
            .finish()
    }
}

impl CompletionCache {
    /// Open the log at `path`, replaying any existing entries.
    ///
    /// Creates the file (and parent directories) if absent. Fails with
    /// `CacheLocked` if another process holds the log.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;
        lock_exclusive(&file)?;

        let completed = replay(&path)?;
        debug!(
            path = %path.display(),
            actions = completed.len(),
            "completion cache loaded"
        );

        Ok(CompletionCache {
            path: Some(path),
            completed,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// A cache that persists nothing (`--no-cache`).
    pub fn in_memory() -> Self {
        CompletionCache {
            path: None,
            completed: HashMap::new(),
            writer: None,
        }
    }

    /// Path of the durable log, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record an action as attempted on the given hosts.
    ///
    /// Appends one line per host, then updates the in-memory set. Safe to
    /// call repeatedly for the same (action, host) pair: replay collapses
    /// duplicates via set semantics.
    pub fn record(&mut self, action: &ActionName, hosts: &[HostAddr]) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            for host in hosts {
                writeln!(writer, "{LINE_PREFIX}{action}{LINE_SEPARATOR}{host}")?;
            }
            writer.flush()?;
        }

        let set = self.completed.entry(action.clone()).or_default();
        for host in hosts {
            set.insert(host.clone());
        }
        Ok(())
    }

    /// Hosts recorded for an action.
    pub fn completed_for(&self, action: &ActionName) -> BTreeSet<HostAddr> {
        self.completed.get(action).cloned().unwrap_or_default()
    }

    /// Derive the status of an action against the current privileged set.
    ///
    /// Recomputed on every render; the caller must pass the live set.
    /// Hosts recorded but no longer in the privileged set still count
    /// toward the superset check (historical completion is never revoked).
    pub fn status(
        &self,
        action: &ActionName,
        current_privileged: &BTreeSet<HostAddr>,
    ) -> CompletionStatus {
        let completed = match self.completed.get(action) {
            Some(set) if !set.is_empty() => set,
            _ => return CompletionStatus::None,
        };

        if !current_privileged.is_empty() && current_privileged.is_subset(completed) {
            CompletionStatus::Complete
        } else {
            CompletionStatus::Partial
        }
    }

    /// Unique hosts across all recorded actions (startup summary).
    pub fn known_host_count(&self) -> usize {
        self.completed
            .values()
            .flatten()
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Total recorded (action, host) pairs.
    pub fn entry_count(&self) -> usize {
        self.completed.values().map(|s| s.len()).sum()
    }
}

/// Replay the log file into the in-memory map, skipping malformed lines.
///
/// Lines are read as raw bytes: a line that is not valid UTF-8 is just
/// another malformed line (warn and continue), not a load failure. Only
/// real I/O errors abort the replay.
fn replay(path: &Path) -> Result<HashMap<ActionName, BTreeSet<HostAddr>>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut completed: HashMap<ActionName, BTreeSet<HostAddr>> = HashMap::new();

    for (line_num, raw) in reader.split(b'\n').enumerate() {
        let raw = raw?;
        let line = match String::from_utf8(raw) {
            Ok(line) => line,
            Err(_) => {
                warn!(
                    path = %path.display(),
                    line = line_num + 1,
                    "skipping non-UTF-8 completion log line"
                );
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line.trim_end_matches('\r')) {
            Some((action, host)) => {
                completed.entry(action).or_default().insert(host);
            }
            None => {
                warn!(
                    path = %path.display(),
                    line = line_num + 1,
                    "skipping malformed completion log line"
                );
            }
        }
    }

    Ok(completed)
}

/// Parse one `Action: <name> on <host>` line.
fn parse_line(line: &str) -> Option<(ActionName, HostAddr)> {
    let rest = line.strip_prefix(LINE_PREFIX)?;
    let (name, host) = rest.rsplit_once(LINE_SEPARATOR)?;
    let host = HostAddr::parse(host)?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((ActionName::new(name), host))
}

/// Take a non-blocking exclusive advisory lock on the log file.
fn lock_exclusive(file: &File) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if result != 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::WouldBlock {
                return Err(Error::CacheLocked);
            }
            return Err(Error::Io(err));
        }
    }
    // On non-unix we just hold the file handle.
    let _ = file;
    Ok(())
}

impl Drop for CompletionCache {
    fn drop(&mut self) {
        if let Some(writer) = &mut self.writer {
            let _ = writer.flush();
        }
        // flock is released when the handle closes.
    }
}
