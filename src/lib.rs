//! Repolint - Hygiene checks for local git repositories
//!
//! Repolint finds the git repositories under a directory and reports the
//! things that tend to get lost: uncommitted changes, detached or unborn
//! heads, branches without upstreams, unpushed or unpulled commits, stashes,
//! and branches nobody has committed to in a while.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, drives the scan)
//! - [`engine`] - Discovery and the concurrent snapshot builder
//! - [`lint`] - Rule engine and the built-in rules
//! - [`core`] - Domain types and configuration
//! - [`git`] - Single interface for all Git operations
//! - [`ui`] - Report rendering
//!
//! # Correctness Invariants
//!
//! 1. Repositories are only ever read
//! 2. Rules see a complete snapshot or none at all
//! 3. One broken rule never hides another rule's findings
//! 4. One broken repository never stops the scan

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod lint;
pub mod ui;
