//! cli
//!
//! Command-line interface layer for Repolint.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and set up logging
//! - Load configuration and apply flag overrides
//! - Drive discovery, snapshotting and evaluation for each repository
//! - Does NOT read repositories directly
//!
//! # Architecture
//!
//! The CLI layer is thin. Repositories are processed one at a time in
//! discovery order; concurrency lives inside each snapshot. A path that
//! is not a usable repository produces a `not-repo` report; a repository
//! that opens but cannot be read produces a blocking `snapshot` report.
//! Either way the scan moves on.
//!
//! # Exit Status
//!
//! - `0`: every report is all-safe
//! - `1`: at least one blocking failure
//! - `2`: fatal error (bad config, unreadable root)

pub mod args;

pub use args::Cli;

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::config::Config;
use crate::engine::{self, build_snapshot, SnapshotError, SnapshotOptions};
use crate::git::GitError;
use crate::lint::{self, Failure, FailureKind, LintReport, RuleRegistry};
use crate::ui::output::{self, Format, RepoReport, Verbosity};

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(path) = config.path() {
        debug!(path = %path.display(), "loaded configuration");
    }

    if !cli.root.is_dir() {
        bail!("{} is not a directory", cli.root.display());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let scanned = runtime.block_on(scan(&cli, &config));
    // Timed-out snapshots may still hold blocking threads.
    runtime.shutdown_timeout(Duration::from_secs(1));

    if scanned? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Snapshot options with flag overrides applied on top of config.
fn snapshot_options(cli: &Cli, config: &Config) -> SnapshotOptions {
    SnapshotOptions {
        ahead_behind_jobs: cli
            .jobs
            .map(|n| n as usize)
            .unwrap_or_else(|| config.ahead_behind_jobs()),
        timeout: Some(
            cli.timeout
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.timeout()),
        ),
    }
}

async fn scan(cli: &Cli, config: &Config) -> Result<bool> {
    let options = snapshot_options(cli, config);
    let format = if cli.json { Format::Json } else { Format::Text };
    let verbosity = Verbosity::from_flags(cli.quiet);

    let repos = engine::discover(&cli.root, &config.ignore());
    debug!(root = %cli.root.display(), count = repos.len(), "discovered repositories");

    let mut all_safe = true;
    for path in repos {
        let report = check_repository(&path, config, &options).await;
        all_safe &= report.all_safe();
        output::emit(&report, format, verbosity).context("failed to write report")?;
    }
    Ok(all_safe)
}

/// Snapshot and lint one repository.
///
/// Never fails: problems opening the repository or reading its config
/// become failures in the returned report.
pub async fn check_repository(
    path: &Path,
    config: &Config,
    options: &SnapshotOptions,
) -> RepoReport {
    let snapshot = match build_snapshot(path, options).await {
        Ok(snapshot) => snapshot,
        Err(e) if e.is_not_repo() => {
            debug!(path = %path.display(), error = %e, "not a usable repository");
            let lint = LintReport::not_repo(not_repo_reason(&e), config.not_repo_safe());
            return RepoReport::new(path, lint);
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "snapshot failed");
            return RepoReport::new(path, LintReport::repo_error(e.to_string()));
        }
    };

    let mut config_failures = Vec::new();
    let repo_config = match Config::load_repo(path) {
        Ok(repo_config) => repo_config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring repository config");
            config_failures
                .push(Failure::lint(lint::CONFIG, e.to_string()).with_kind(FailureKind::Config));
            None
        }
    };

    let settings = config.rule_settings(repo_config.as_ref());
    let registry = RuleRegistry::builtin(settings.stale_days).without(&settings.disabled_rules);
    debug!(path = %path.display(), rules = ?registry.names(), "evaluating");

    let lint = lint::evaluate(&registry, &snapshot).prepend(config_failures);
    RepoReport::new(path, lint)
}

/// Short reason for a `not-repo` failure; the report already names the path.
fn not_repo_reason(e: &SnapshotError) -> String {
    match e {
        SnapshotError::Open(GitError::NotARepo { .. }) => "not a git repository".to_string(),
        SnapshotError::Open(inner) => inner.to_string(),
        other => other.to_string(),
    }
}
