//! rt - Relay Triage console.
//!
//! Reads relayed session records from a file or HTTP endpoint, reconciles
//! them into the session store, and drives the interactive action menu.
//! Stdout carries the menu and executor output; logs go to stderr.

use clap::Parser;
use rt_core::cache::CompletionCache;
use rt_core::catalog::Catalog;
use rt_core::dispatch::{ActionExecutor, CommandExecutor, OutputSink};
use rt_core::exit_codes::ExitCode;
use rt_core::logging::{init_logging, level_for, LogFormat};
use rt_core::menu::{Console, MenuOutcome};
use rt_core::source::{FileSource, HttpSource, SessionSource, SourceChain};
use rt_core::store::SessionStore;
use rt_common::{Error, RunId};
use rt_config::{load_policy, resolve_cache_path};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Relay Triage: a post-compromise session triage console.
#[derive(Parser, Debug)]
#[command(name = "rt", version, about = "Relay Triage console for relayed session batches")]
struct Cli {
    /// Relay tool output file to read sessions from.
    input_file: Option<PathBuf>,

    /// HTTP endpoint serving session records as JSON (tried before the file).
    #[arg(long, value_name = "URL")]
    source_url: Option<String>,

    /// Completion log path (default: state directory).
    #[arg(long, value_name = "PATH")]
    cache: Option<PathBuf>,

    /// Keep completion state in memory only; nothing persists.
    #[arg(long)]
    no_cache: bool,

    /// Only show executor output lines containing this substring.
    #[arg(long, value_name = "SUBSTRING")]
    grep: Option<String>,

    /// Append raw executor output to this file.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Config file path (default: ~/.config/relay-triage/config.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override whether failed attempts count as completion.
    #[arg(long, value_name = "BOOL")]
    record_failures: Option<bool>,

    /// Override the per-host executor timeout, in seconds.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log format: human or jsonl.
    #[arg(long, default_value = "human", value_parser = parse_log_format)]
    log_format: LogFormat,
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    s.parse()
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, level_for(cli.verbose, cli.quiet));

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, code = err.code(), "fatal");
            exit_code_for(&err)
        }
    };
    std::process::exit(code.as_i32());
}

/// Map a fatal error to the exit-code contract.
fn exit_code_for(err: &Error) -> ExitCode {
    match err {
        Error::Config(_) | Error::InvalidPolicy(_) => ExitCode::ArgsError,
        Error::NoSessionData(_) | Error::SourceUnavailable(_) => ExitCode::NoSessionData,
        Error::CacheLocked => ExitCode::LockError,
        Error::Io(_) | Error::Json(_) => ExitCode::IoError,
        _ => ExitCode::InternalError,
    }
}

fn run(cli: Cli) -> rt_common::Result<ExitCode> {
    let run_id = RunId::new();
    info!(%run_id, "starting rt");

    let mut policy = load_policy(cli.config.as_deref())?;
    if let Some(record_failures) = cli.record_failures {
        policy.record_failures = record_failures;
    }
    if let Some(timeout) = cli.timeout {
        policy.executor_timeout_secs = timeout;
    }
    policy.validate()?;

    let mut sources: Vec<Box<dyn SessionSource>> = Vec::new();
    if let Some(url) = &cli.source_url {
        sources.push(Box::new(HttpSource::new(url.clone())?));
    }
    if let Some(path) = &cli.input_file {
        sources.push(Box::new(FileSource::new(path.clone())));
    }
    if sources.is_empty() {
        return Err(Error::Config(
            "no session source: pass an input file or --source-url".to_string(),
        ));
    }
    let chain = SourceChain::new(sources);

    let records = chain.poll()?;

    let mut cache = if cli.no_cache {
        CompletionCache::in_memory()
    } else {
        let (path, origin) = resolve_cache_path(cli.cache.as_deref());
        info!(path = %path.display(), %origin, "opening completion log");
        CompletionCache::open(path)?
    };

    let mut store = SessionStore::new();
    let diff = store.ingest(records);
    info!(%diff, "initial session ingest");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Number of unique systems: {}", store.host_count())?;
    writeln!(out, "Number of unique identities: {}", store.identity_count())?;
    writeln!(out, "Previously cached hosts: {}", cache.known_host_count())?;

    let executor: Option<CommandExecutor> = policy.executor_command.as_ref().map(|template| {
        CommandExecutor::new(
            template.clone(),
            Duration::from_secs(policy.executor_timeout_secs),
        )
    });

    let mut sink = OutputSink::new(cli.grep.clone(), cli.output.as_deref())?;
    let catalog = Catalog::builtin();

    let outcome = {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut console = Console {
            store: &mut store,
            cache: &mut cache,
            catalog: &catalog,
            policy: &policy,
            executor: executor.as_ref().map(|e| e as &dyn ActionExecutor),
            source: &chain,
            sink: &mut sink,
        };
        console.run(&mut input, &mut out)?
    };

    Ok(exit_code_for_outcome(outcome))
}

fn exit_code_for_outcome(outcome: MenuOutcome) -> ExitCode {
    if outcome.dispatched == 0 {
        ExitCode::Clean
    } else if outcome.failed_attempts > 0 {
        ExitCode::PartialFail
    } else {
        ExitCode::ActionsOk
    }
}
