//! Batch execution controller.
//!
//! One dispatch walks the state machine: select targets → confirm (when
//! more than a policy-set number of hosts) → execute sequentially →
//! record after each host → reconcile against a fresh poll. Execution is
//! best-effort: a failing, timing-out, or identity-less host is reported
//! and the batch moves on. Completion records are written per host as
//! soon as the attempt finishes, so an aborted batch keeps its partial
//! progress.

pub mod executor;

pub use executor::{ActionExecutor, CommandExecutor, ExecError, ExecOutcome, NoopExecutor};

use crate::cache::{CompletionCache, CompletionStatus};
use crate::input::TargetExpr;
use crate::source::SessionSource;
use crate::store::{IngestDiff, SessionStore};
use rt_common::{ActionName, Error, HostAddr, Result};
use rt_config::Policy;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Per-host outcome of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostStatus {
    /// Executor ran and exited zero.
    Success,
    /// Executor ran and exited non-zero.
    Failed,
    /// Executor exceeded the per-host timeout.
    TimedOut,
    /// Host has no known privileged identity; nothing was dispatched.
    SkippedNoIdentity,
    /// Executor could not run at all (spawn failure).
    ExecutorError,
}

/// One host's result, with whether it was written to the cache.
#[derive(Debug, Clone, Serialize)]
pub struct HostOutcome {
    pub host: HostAddr,
    pub status: HostStatus,
    pub recorded: bool,
}

/// Result of one batch dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub action: ActionName,
    pub outcomes: Vec<HostOutcome>,
    /// Coverage of the action against the privileged set as of the end of
    /// the batch.
    pub aggregate: CompletionStatus,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !matches!(o.status, HostStatus::SkippedNoIdentity))
            .count()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, HostStatus::Success))
            .count()
    }
}

/// Where executor stdout goes: the console (optionally filtered) and an
/// optional raw capture file.
pub struct OutputSink {
    grep: Option<String>,
    capture: Option<std::fs::File>,
    console: Box<dyn Write>,
}

impl OutputSink {
    /// Sink writing to the process stdout, with optional substring filter
    /// and capture file.
    pub fn new(grep: Option<String>, capture_path: Option<&Path>) -> Result<Self> {
        let capture = match capture_path {
            Some(path) => Some(
                std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?,
            ),
            None => None,
        };
        Ok(OutputSink {
            grep,
            capture,
            console: Box::new(std::io::stdout()),
        })
    }

    /// Sink writing to an arbitrary writer (tests).
    pub fn to_writer(grep: Option<String>, console: Box<dyn Write>) -> Self {
        OutputSink {
            grep,
            capture: None,
            console,
        }
    }

    /// Emit one host's output: raw to the capture file, filtered to the
    /// console.
    fn emit(&mut self, host: &HostAddr, action: &ActionName, text: &str) -> Result<()> {
        if let Some(capture) = &mut self.capture {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(capture, "=== {ts} {action} on {host} ===")?;
            capture.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                writeln!(capture)?;
            }
        }

        for line in text.lines() {
            let show = match &self.grep {
                Some(needle) => line.contains(needle.as_str()),
                None => true,
            };
            if show {
                writeln!(self.console, "{line}")?;
            }
        }
        Ok(())
    }
}

/// Drives one dispatch over the store, cache, and policy.
pub struct DispatchController<'a> {
    store: &'a mut SessionStore,
    cache: &'a mut CompletionCache,
    policy: &'a Policy,
}

impl<'a> DispatchController<'a> {
    pub fn new(
        store: &'a mut SessionStore,
        cache: &'a mut CompletionCache,
        policy: &'a Policy,
    ) -> Self {
        DispatchController {
            store,
            cache,
            policy,
        }
    }

    /// Resolve a target expression against the current privileged set.
    ///
    /// `all` snapshots the set at selection time; it is not re-evaluated
    /// mid-batch. Unknown or unprivileged tokens in an explicit list are
    /// dropped with a warning. An empty result is `NoValidTargets`, which
    /// the menu loop treats as a re-prompt.
    pub fn select_targets(&self, expr: &TargetExpr) -> Result<Vec<HostAddr>> {
        let privileged = self.store.privileged_hosts();
        match expr {
            TargetExpr::All => {
                if privileged.is_empty() {
                    return Err(Error::NoValidTargets("no privileged hosts known".into()));
                }
                Ok(privileged.into_iter().collect())
            }
            TargetExpr::Hosts(requested) => {
                let mut targets = Vec::new();
                for host in requested {
                    if privileged.contains(host) {
                        targets.push(host.clone());
                    } else {
                        warn!(host = %host, "dropping target: not a known privileged host");
                    }
                }
                if targets.is_empty() {
                    return Err(Error::NoValidTargets(
                        "no requested host is a known privileged host".into(),
                    ));
                }
                Ok(targets)
            }
            TargetExpr::Cancel | TargetExpr::Empty => {
                Err(Error::NoValidTargets("nothing selected".into()))
            }
        }
    }

    /// Whether this target set needs an operator confirmation first.
    pub fn needs_confirmation(&self, targets: &[HostAddr]) -> bool {
        targets.len() >= self.policy.confirm_threshold
    }

    /// Run the action against each target in order.
    ///
    /// Per-host identity lookup failures, executor failures, and timeouts
    /// are contained to that host. Recording follows
    /// `Policy::record_failures`: successes always record; failed and
    /// timed-out attempts record only when the policy says attempts count.
    /// Spawn-level executor errors never record (nothing was attempted on
    /// the host).
    pub fn execute_batch(
        &mut self,
        action: &ActionName,
        targets: &[HostAddr],
        executor: &dyn ActionExecutor,
        sink: &mut OutputSink,
    ) -> Result<BatchReport> {
        let mut outcomes = Vec::with_capacity(targets.len());

        for host in targets {
            let identity = match self.store.identity_for(host, true) {
                Some(identity) => identity.clone(),
                None => {
                    warn!(host = %host, "skipping host: no privileged identity known");
                    outcomes.push(HostOutcome {
                        host: host.clone(),
                        status: HostStatus::SkippedNoIdentity,
                        recorded: false,
                    });
                    continue;
                }
            };

            let (status, record) = match executor.execute(host, &identity, action) {
                Ok(outcome) => {
                    if let Some(stdout) = outcome.stdout() {
                        sink.emit(host, action, stdout)?;
                    }
                    match outcome {
                        ExecOutcome::Success { .. } => (HostStatus::Success, true),
                        ExecOutcome::Failed { code, .. } => {
                            warn!(host = %host, action = %action, code = ?code,
                                  "executor exited non-zero");
                            (HostStatus::Failed, self.policy.record_failures)
                        }
                        ExecOutcome::TimedOut => {
                            (HostStatus::TimedOut, self.policy.record_failures)
                        }
                    }
                }
                Err(err) => {
                    warn!(host = %host, action = %action, error = %err, "executor error");
                    (HostStatus::ExecutorError, false)
                }
            };

            if record {
                self.cache.record(action, std::slice::from_ref(host))?;
            }
            outcomes.push(HostOutcome {
                host: host.clone(),
                status,
                recorded: record,
            });
        }

        let aggregate = self.cache.status(action, &self.store.privileged_hosts());
        info!(
            action = %action,
            attempted = outcomes.len(),
            aggregate = %aggregate,
            "batch finished"
        );

        Ok(BatchReport {
            action: action.clone(),
            outcomes,
            aggregate,
        })
    }

    /// Re-poll the source and merge, reporting what grew.
    pub fn reconcile(&mut self, source: &dyn SessionSource) -> Result<IngestDiff> {
        let records = source.poll()?;
        let diff = self.store.ingest(records);
        if !diff.is_empty() {
            info!(%diff, "session universe grew during operation");
        }
        Ok(diff)
    }

    /// Live status for menu rendering.
    pub fn status_of(&self, action: &ActionName) -> CompletionStatus {
        self.cache.status(action, &self.store.privileged_hosts())
    }
}
