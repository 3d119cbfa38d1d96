//! Interactive console loop.
//!
//! A thin view over the catalog, store, cache, and controller: it renders
//! menus, decodes operator input once at the boundary, and hands resolved
//! actions to the dispatch controller. Invalid input re-renders the same
//! menu; nothing here is fatal short of an I/O failure on the terminal
//! itself.

use crate::cache::{CompletionCache, CompletionStatus};
use crate::catalog::{ActionNode, Catalog, Resolved};
use crate::dispatch::{ActionExecutor, DispatchController, HostStatus, OutputSink};
use crate::input::{self, ControlToken, OperatorInput, TargetExpr};
use crate::source::SessionSource;
use crate::store::SessionStore;
use rt_common::{ActionName, Error, Result};
use rt_config::Policy;
use std::io::{BufRead, Write};
use tracing::warn;

/// What the loop did, for exit-code mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenuOutcome {
    /// Batches dispatched.
    pub dispatched: usize,
    /// Per-host attempts that failed or timed out, across all batches.
    pub failed_attempts: usize,
}

/// Everything the loop needs, borrowed for its lifetime.
pub struct Console<'a> {
    pub store: &'a mut SessionStore,
    pub cache: &'a mut CompletionCache,
    pub catalog: &'a Catalog,
    pub policy: &'a Policy,
    pub executor: Option<&'a dyn ActionExecutor>,
    pub source: &'a dyn SessionSource,
    pub sink: &'a mut OutputSink,
}

impl Console<'_> {
    /// Run the menu loop until the operator quits or input ends.
    pub fn run(&mut self, input: &mut dyn BufRead, out: &mut dyn Write) -> Result<MenuOutcome> {
        let mut outcome = MenuOutcome::default();
        let mut path: Vec<usize> = Vec::new();

        loop {
            let node = match self.catalog.resolve(&path)? {
                Resolved::Category(node) => node,
                // Paths are only ever extended through categories below.
                _ => unreachable!("navigation path always ends on a category"),
            };
            self.render_menu(out, node, !path.is_empty())?;

            let Some(line) = read_line(input)? else {
                // End of input behaves like quit.
                return Ok(outcome);
            };

            match input::decode(&line) {
                OperatorInput::Control(ControlToken::Quit) => return Ok(outcome),
                OperatorInput::Control(ControlToken::Back) => {
                    path.pop();
                }
                OperatorInput::Control(_) | OperatorInput::Invalid => {
                    writeln!(out, "Invalid selection. Please try again.")?;
                }
                OperatorInput::Numeric(n) => {
                    let mut candidate = path.clone();
                    candidate.push(n - 1);
                    match self.catalog.resolve(&candidate) {
                        Ok(Resolved::Category(_)) => path = candidate,
                        Ok(Resolved::Unavailable(name)) => {
                            writeln!(out, "'{name}' is currently unavailable.")?;
                        }
                        Ok(Resolved::Action(name)) => {
                            let name = name.clone();
                            self.run_dispatch(&name, input, out, &mut outcome)?;
                        }
                        Err(err @ Error::OutOfRange { .. }) => {
                            writeln!(out, "{err}. Please try again.")?;
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }
    }

    /// One dispatch: target selection, confirmation, batch, reconcile.
    fn run_dispatch(
        &mut self,
        action: &ActionName,
        input: &mut dyn BufRead,
        out: &mut dyn Write,
        outcome: &mut MenuOutcome,
    ) -> Result<()> {
        let Some(executor) = self.executor else {
            writeln!(
                out,
                "No executor command configured; set executor_command in config.toml."
            )?;
            return Ok(());
        };

        let targets = loop {
            writeln!(
                out,
                "Enter an IP, a comma/space/semicolon separated list, or 'all' ('cancel' to abort):"
            )?;
            let Some(line) = read_line(input)? else {
                return Ok(());
            };
            match input::parse_target_expr(&line) {
                TargetExpr::Cancel => return Ok(()),
                expr @ (TargetExpr::All | TargetExpr::Hosts(_)) => {
                    let controller =
                        DispatchController::new(self.store, self.cache, self.policy);
                    match controller.select_targets(&expr) {
                        Ok(targets) => break targets,
                        Err(err) => writeln!(out, "{err}. Please try again.")?,
                    }
                }
                TargetExpr::Empty => {
                    writeln!(out, "No valid IPs entered. Please try again.")?;
                }
            }
        };

        {
            let controller = DispatchController::new(self.store, self.cache, self.policy);
            if controller.needs_confirmation(&targets) {
                writeln!(
                    out,
                    "About to run '{action}' on {} hosts. Proceed? [y/N]",
                    targets.len()
                )?;
                let confirmed = matches!(
                    read_line(input)?.as_deref().map(str::trim),
                    Some("y") | Some("Y") | Some("yes")
                );
                if !confirmed {
                    writeln!(out, "Aborted.")?;
                    return Ok(());
                }
            }
        }

        let report = {
            let mut controller = DispatchController::new(self.store, self.cache, self.policy);
            controller.execute_batch(action, &targets, executor, self.sink)?
        };

        outcome.dispatched += 1;
        for host_outcome in &report.outcomes {
            let status = match host_outcome.status {
                HostStatus::Success => "ok",
                HostStatus::Failed => "failed",
                HostStatus::TimedOut => "timed out",
                HostStatus::SkippedNoIdentity => "skipped (no privileged identity)",
                HostStatus::ExecutorError => "executor error",
            };
            if !matches!(host_outcome.status, HostStatus::Success) {
                outcome.failed_attempts += 1;
            }
            writeln!(out, "  {}: {}", host_outcome.host, status)?;
        }
        writeln!(out, "{} {}", status_marker(report.aggregate), action)?;

        // The target universe may have grown while the batch ran.
        let mut controller = DispatchController::new(self.store, self.cache, self.policy);
        match controller.reconcile(self.source) {
            Ok(diff) if !diff.is_empty() => writeln!(out, "Reconciled: {diff}")?,
            Ok(_) => {}
            Err(err) => warn!(error = %err, "post-batch reconcile failed"),
        }

        Ok(())
    }

    fn render_menu(
        &self,
        out: &mut dyn Write,
        node: &ActionNode,
        show_back: bool,
    ) -> Result<()> {
        let Some(children) = node.children() else {
            return Ok(());
        };
        let privileged = self.store.privileged_hosts();

        writeln!(out, "\n{}", node.label())?;
        for (i, child) in children.iter().enumerate() {
            let marker = match child {
                ActionNode::Category { .. } => "[ DIRECTORY ] ".to_string(),
                ActionNode::Action {
                    available: false, ..
                } => "[ UNAVAILABLE ] ".to_string(),
                ActionNode::Action { name, .. } => {
                    match self.cache.status(name, &privileged) {
                        CompletionStatus::None => String::new(),
                        status => format!("{} ", status_marker(status)),
                    }
                }
            };
            writeln!(out, "{}. {}{}", i + 1, marker, child.label())?;
        }
        if show_back {
            writeln!(out, "0. Back")?;
        }
        writeln!(out, "q. Quit")?;
        Ok(())
    }
}

fn status_marker(status: CompletionStatus) -> &'static str {
    match status {
        CompletionStatus::Complete => "[ COMPLETE ]",
        CompletionStatus::Partial => "[ PARTIAL ]",
        CompletionStatus::None => "[ PENDING ]",
    }
}

/// Read one line, `None` on end of input.
fn read_line(input: &mut dyn BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    let n = input.read_line(&mut line)?;
    if n == 0 {
        Ok(None)
    } else {
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::NoopExecutor;
    use crate::store::SessionRecord;
    use rt_common::{HostAddr, Identity};
    use std::io::Cursor;

    struct EmptySource;
    impl SessionSource for EmptySource {
        fn poll(&self) -> Result<Vec<SessionRecord>> {
            Ok(Vec::new())
        }
        fn describe(&self) -> String {
            "empty".to_string()
        }
    }

    fn seeded_store() -> SessionStore {
        let mut store = SessionStore::new();
        store.ingest(vec![SessionRecord::new(
            HostAddr("10.0.0.5".into()),
            Identity("CORP/admin".into()),
            true,
        )]);
        store
    }

    fn run_script(script: &str) -> (MenuOutcome, String) {
        let mut store = seeded_store();
        let mut cache = CompletionCache::in_memory();
        let catalog = Catalog::builtin();
        let policy = Policy::default();
        let executor = NoopExecutor;
        let mut sink = OutputSink::to_writer(None, Box::new(std::io::sink()));

        let mut console = Console {
            store: &mut store,
            cache: &mut cache,
            catalog: &catalog,
            policy: &policy,
            executor: Some(&executor),
            source: &EmptySource,
            sink: &mut sink,
        };

        let mut input = Cursor::new(script.to_string());
        let mut out: Vec<u8> = Vec::new();
        let outcome = console.run(&mut input, &mut out).unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_quit_immediately() {
        let (outcome, rendered) = run_script("q\n");
        assert_eq!(outcome.dispatched, 0);
        assert!(rendered.contains("Main Menu"));
        assert!(rendered.contains("1. Enumeration"));
    }

    #[test]
    fn test_eof_behaves_like_quit() {
        let (outcome, _) = run_script("");
        assert_eq!(outcome.dispatched, 0);
    }

    #[test]
    fn test_invalid_selection_rerenders() {
        let (_, rendered) = run_script("banana\nq\n");
        assert!(rendered.contains("Invalid selection"));
        // Menu rendered twice.
        assert_eq!(rendered.matches("Main Menu").count(), 2);
    }

    #[test]
    fn test_out_of_range_reported_not_fatal() {
        let (_, rendered) = run_script("99\nq\n");
        assert!(rendered.contains("out of range"));
    }

    #[test]
    fn test_navigate_and_back() {
        let (_, rendered) = run_script("1\n0\nq\n");
        assert!(rendered.contains("Enumeration"));
        assert!(rendered.contains("List shares"));
    }

    #[test]
    fn test_unavailable_leaf_not_dispatched() {
        // Credentials (3) → nxc SAM (2).
        let (outcome, rendered) = run_script("3\n2\nq\n");
        assert!(rendered.contains("currently unavailable"));
        assert_eq!(outcome.dispatched, 0);
    }

    #[test]
    fn test_single_host_dispatch_no_confirmation() {
        // Enumeration (1) → List shares (5) → target 10.0.0.5 → quit.
        let (outcome, rendered) = run_script("1\n5\n10.0.0.5\nq\nq\n");
        assert_eq!(outcome.dispatched, 1);
        assert_eq!(outcome.failed_attempts, 0);
        assert!(rendered.contains("10.0.0.5: ok"));
        assert!(rendered.contains("[ COMPLETE ] List shares"));
    }

    #[test]
    fn test_all_dispatch_requires_no_confirm_for_one_host() {
        let (outcome, _) = run_script("1\n5\nall\nq\n");
        assert_eq!(outcome.dispatched, 1);
    }

    #[test]
    fn test_cancel_target_prompt() {
        let (outcome, _) = run_script("1\n5\ncancel\nq\n");
        assert_eq!(outcome.dispatched, 0);
    }

    #[test]
    fn test_unknown_targets_reprompt() {
        let (outcome, rendered) = run_script("1\n5\n172.16.0.99\ncancel\nq\n");
        assert_eq!(outcome.dispatched, 0);
        assert!(rendered.contains("Please try again"));
    }

    #[test]
    fn test_status_marker_rendered_after_dispatch() {
        // Dispatch, then re-render the Enumeration menu: marker shows.
        let (_, rendered) = run_script("1\n5\n10.0.0.5\n0\n1\nq\n");
        assert!(rendered.contains("[ COMPLETE ] List shares"));
    }
}
