//! Action executor collaborators.
//!
//! The controller never builds tool command lines itself; it hands
//! (host, identity, action) to an `ActionExecutor`. The shipped
//! `CommandExecutor` renders an operator-supplied template and runs it
//! with a bounded per-host timeout and TERM → KILL escalation, so one
//! wedged host can never hang a batch.

use rt_common::{ActionName, HostAddr, Identity};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Cap on captured stdout/stderr per host.
const MAX_OUTPUT_BYTES: u64 = 1024 * 1024;

/// Grace period between SIGTERM and SIGKILL.
const TERM_GRACE: Duration = Duration::from_millis(500);

/// Poll interval while waiting for the child.
const WAIT_POLL: Duration = Duration::from_millis(25);

/// Errors from the executor itself (as opposed to the tool failing).
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("command failed to spawn: {0}")]
    SpawnFailed(String),

    #[error("empty executor command template")]
    EmptyTemplate,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of one per-host attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Tool exited zero.
    Success { stdout: String },
    /// Tool exited non-zero (still an attempt for cache purposes,
    /// depending on policy).
    Failed { code: Option<i32>, stdout: String },
    /// Tool exceeded the per-host timeout and was killed.
    TimedOut,
}

impl ExecOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecOutcome::Success { .. })
    }

    /// Captured stdout, if the tool ran to completion.
    pub fn stdout(&self) -> Option<&str> {
        match self {
            ExecOutcome::Success { stdout } | ExecOutcome::Failed { stdout, .. } => Some(stdout),
            ExecOutcome::TimedOut => None,
        }
    }
}

/// Collaborator contract: run one action against one host.
pub trait ActionExecutor {
    fn execute(
        &self,
        host: &HostAddr,
        identity: &Identity,
        action: &ActionName,
    ) -> Result<ExecOutcome, ExecError>;
}

/// No-op executor (tests and scaffolding).
#[derive(Debug, Default)]
pub struct NoopExecutor;

impl ActionExecutor for NoopExecutor {
    fn execute(
        &self,
        _host: &HostAddr,
        _identity: &Identity,
        _action: &ActionName,
    ) -> Result<ExecOutcome, ExecError> {
        Ok(ExecOutcome::Success {
            stdout: String::new(),
        })
    }
}

/// Executor that renders a command template and runs it.
///
/// Template tokens are split on whitespace before substitution, so a
/// substituted value can never grow extra arguments; `{host}`,
/// `{identity}`, and `{action}` are replaced within each token.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    template: String,
    timeout: Duration,
}

impl CommandExecutor {
    pub fn new(template: impl Into<String>, timeout: Duration) -> Self {
        CommandExecutor {
            template: template.into(),
            timeout,
        }
    }

    fn render(&self, host: &HostAddr, identity: &Identity, action: &ActionName) -> Vec<String> {
        self.template
            .split_whitespace()
            .map(|token| {
                token
                    .replace("{host}", host.as_str())
                    .replace("{identity}", identity.as_str())
                    .replace("{action}", action.as_str())
            })
            .collect()
    }
}

impl ActionExecutor for CommandExecutor {
    fn execute(
        &self,
        host: &HostAddr,
        identity: &Identity,
        action: &ActionName,
    ) -> Result<ExecOutcome, ExecError> {
        let argv = self.render(host, identity, action);
        let (program, args) = argv.split_first().ok_or(ExecError::EmptyTemplate)?;

        debug!(host = %host, action = %action, program = %program, "spawning executor command");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::SpawnFailed(format!("{program}: {e}")))?;

        let stdout_handle = child.stdout.take().map(spawn_capped_reader);
        let stderr_handle = child.stderr.take().map(spawn_capped_reader);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    warn!(host = %host, action = %action, timeout = ?self.timeout,
                          "executor timed out, killing");
                    terminate(&mut child);
                    let _ = child.wait();
                    drain(stdout_handle);
                    drain(stderr_handle);
                    return Ok(ExecOutcome::TimedOut);
                }
                None => thread::sleep(WAIT_POLL),
            }
        };

        let stdout = drain(stdout_handle);
        let stderr = drain(stderr_handle);
        if !stderr.is_empty() {
            debug!(host = %host, action = %action, "executor stderr: {}", stderr.trim_end());
        }

        if status.success() {
            Ok(ExecOutcome::Success { stdout })
        } else {
            Ok(ExecOutcome::Failed {
                code: status.code(),
                stdout,
            })
        }
    }
}

/// Read a child stream on its own thread, capped at `MAX_OUTPUT_BYTES`;
/// the remainder is drained so the child never blocks on a full pipe.
fn spawn_capped_reader<R: Read + Send + 'static>(stream: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut stream = stream;
        let mut buf = Vec::new();
        let _ = stream.by_ref().take(MAX_OUTPUT_BYTES).read_to_end(&mut buf);
        let _ = std::io::copy(&mut stream, &mut std::io::sink());
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn drain(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// SIGTERM, grace, then SIGKILL (plain kill on non-unix).
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        let pid = child.id() as libc::pid_t;
        unsafe {
            libc::kill(pid, libc::SIGTERM);
        }
        let grace_end = Instant::now() + TERM_GRACE;
        while Instant::now() < grace_end {
            if matches!(child.try_wait(), Ok(Some(_))) {
                return;
            }
            thread::sleep(WAIT_POLL);
        }
    }
    let _ = child.kill();
}
