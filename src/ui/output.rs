//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Reports go to stdout, one block (text) or one line (JSON) per
//! repository. Diagnostics go to stderr. Quiet mode hides clean
//! repositories but never hides failures.

use std::fmt::{Display, Write as _};
use std::io::{self, Write};
use std::path::PathBuf;

use serde::Serialize;

use crate::lint::{Failure, FailureKind, LintReport};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - only repositories with failures
    Quiet,
    /// Normal mode - every repository
    Normal,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        }
    }
}

/// How reports are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

/// The lint outcome for one repository path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub lint: LintReport,
}

impl RepoReport {
    pub fn new(path: impl Into<PathBuf>, lint: LintReport) -> Self {
        Self {
            path: path.into(),
            lint,
        }
    }

    /// True iff every failure is safe.
    pub fn all_safe(&self) -> bool {
        self.lint.all_safe
    }
}

/// Render a report as text.
///
/// ```text
/// /src/app
///   error	no-uncommitted		a.txt
///   warning	not-repo		could not open
/// ```
pub fn render_text(report: &RepoReport) -> String {
    let mut out = format!("{}\n", report.path.display());
    if report.lint.is_clean() {
        out.push_str("  OK\n");
        return out;
    }
    for failure in &report.lint.failures {
        let _ = writeln!(
            out,
            "  {}\t{}\t\t{}",
            severity(failure),
            failure.rule,
            failure.message
        );
    }
    out
}

/// Render a report as one line of JSON.
pub fn render_json(report: &RepoReport) -> serde_json::Result<String> {
    serde_json::to_string(report)
}

/// Print a report to stdout in the chosen format.
///
/// A closed stdout is returned as an error rather than panicking.
pub fn emit(report: &RepoReport, format: Format, verbosity: Verbosity) -> io::Result<()> {
    let mut out = io::stdout().lock();
    write_report(&mut out, report, format, verbosity)?;
    out.flush()
}

/// Write a report to `out` in the chosen format.
pub fn write_report(
    out: &mut impl Write,
    report: &RepoReport,
    format: Format,
    verbosity: Verbosity,
) -> io::Result<()> {
    match format {
        Format::Json => {
            let line = render_json(report).map_err(io::Error::other)?;
            writeln!(out, "{}", line)
        }
        Format::Text => {
            if verbosity == Verbosity::Quiet && report.lint.is_clean() {
                return Ok(());
            }
            write!(out, "{}", render_text(report))
        }
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    let _ = writeln!(io::stderr(), "error: {}", message);
}

fn severity(failure: &Failure) -> &'static str {
    if failure.kind == FailureKind::Internal {
        "internal"
    } else if failure.safe {
        "warning"
    } else {
        "error"
    }
}
