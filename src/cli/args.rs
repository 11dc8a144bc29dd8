//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Flags
//!
//! - `[ROOT]`: directory to scan (default `.`)
//! - `--config <path>`: global config file
//! - `--timeout <secs>` / `--jobs <n>`: override config values
//! - `--json`: one JSON object per repository
//! - `--quiet` / `-q`: hide clean repositories
//! - `--debug`: enable debug logging

use clap::Parser;
use std::path::PathBuf;

/// Repolint - Check local git repositories for hygiene problems
#[derive(Parser, Debug)]
#[command(name = "repolint")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
EXAMPLES:
    # Check every repository under the current directory
    repolint

    # Check ~/src, showing only repositories with problems
    repolint -q ~/src

    # Machine-readable output
    repolint --json ~/src | jq 'select(.all_safe | not)'")]
pub struct Cli {
    /// Directory to search for repositories
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Read configuration from this file instead of the default locations
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Give up on a repository after this many seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Maximum concurrent ahead/behind computations per repository
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub jobs: Option<u64>,

    /// Emit one JSON object per repository
    #[arg(long)]
    pub json: bool,

    /// Only print repositories with failures
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}
