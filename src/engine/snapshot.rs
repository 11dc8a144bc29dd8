//! engine::snapshot
//!
//! Point-in-time view of one repository.
//!
//! # Architecture
//!
//! The builder reads head state first, because it decides whether the
//! working tree is worth scanning. It then runs three facets concurrently,
//! each on its own blocking task with its own repository handle:
//!
//! ```text
//!            +--> statuses (skipped when unborn)
//! head ------+--> references --> upstream matcher (bounded fan-out)
//!            +--> stashes
//! ```
//!
//! All facets are joined before the snapshot is returned.
//!
//! # Failure Policy
//!
//! Fail-fast: the first facet error aborts the snapshot and is returned
//! tagged with the facet it came from. Sibling facets run on their own
//! handles, so a failure never leaves partial data in a returned
//! snapshot. Tolerated absences (no upstream, pruned remote, broken tag,
//! duplicate remote name) are not errors.
//!
//! # Invariants
//!
//! - Scan is read-only; it never mutates the repository
//! - `unborn` implies `statuses` is empty
//! - `references` is sorted by name
//! - `stashes` is in stack order, most recent first

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::upstream;
use crate::core::config::DEFAULT_AHEAD_BEHIND_JOBS;
use crate::git::{Git, GitError, GitState, Reference, StashEntry, StatusEntry};

/// The independently fetched parts of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Head,
    Statuses,
    References,
    Stashes,
}

impl std::fmt::Display for Facet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Facet::Head => "head",
            Facet::Statuses => "statuses",
            Facet::References => "references",
            Facet::Stashes => "stashes",
        };
        write!(f, "{}", name)
    }
}

/// Errors that stop a snapshot from being built.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The path could not be opened as a repository.
    #[error("failed to open repository: {0}")]
    Open(#[source] GitError),

    /// One facet failed outright.
    #[error("failed to read {facet}: {source}")]
    Facet {
        facet: Facet,
        #[source]
        source: GitError,
    },

    /// Divergence for one branch could not be computed.
    #[error("failed to compare {branch} with {upstream}: {source}")]
    AheadBehind {
        branch: String,
        upstream: String,
        #[source]
        source: GitError,
    },

    /// A facet task panicked or was cancelled.
    #[error("{facet} task failed: {message}")]
    TaskFailed { facet: Facet, message: String },

    /// The snapshot did not finish in time.
    #[error("snapshot timed out after {0:?}")]
    Timeout(Duration),
}

impl SnapshotError {
    /// True when the path simply is not a usable repository.
    pub fn is_not_repo(&self) -> bool {
        matches!(
            self,
            SnapshotError::Open(GitError::NotARepo { .. } | GitError::BareRepo)
        )
    }
}

/// Knobs for building a snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    /// Cap on concurrent ahead/behind computations.
    pub ahead_behind_jobs: usize,
    /// Abort the snapshot after this long.
    pub timeout: Option<Duration>,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            ahead_behind_jobs: DEFAULT_AHEAD_BEHIND_JOBS,
            timeout: None,
        }
    }
}

/// Complete snapshot of one repository.
///
/// Built fresh on every run and never modified afterwards; rules receive
/// it by shared reference.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Where the repository lives.
    pub path: PathBuf,
    /// HEAD names a branch with no commits.
    pub unborn: bool,
    /// HEAD points directly at a commit.
    pub detached: bool,
    /// In-progress operation (merge, rebase, ...).
    pub state: GitState,
    /// Working-tree entries; empty when `unborn`.
    pub statuses: Vec<StatusEntry>,
    /// Every reference, resolved.
    pub references: Vec<Reference>,
    /// Stash stack, most recent first.
    pub stashes: Vec<StashEntry>,
}

impl Snapshot {
    /// Local branches.
    pub fn branches(&self) -> impl Iterator<Item = &Reference> {
        self.references.iter().filter(|r| r.is_branch)
    }

    /// The branch HEAD points to, if it exists.
    pub fn head_branch(&self) -> Option<&Reference> {
        self.references.iter().find(|r| r.is_head)
    }
}

/// Build a snapshot of the repository at `path`.
///
/// # Errors
///
/// Returns [`SnapshotError::Open`] when `path` is not a repository, and a
/// facet-tagged error when any part of the snapshot cannot be read.
///
/// # Example
///
/// ```ignore
/// let snapshot = build_snapshot(Path::new("."), &SnapshotOptions::default()).await?;
/// for branch in snapshot.branches() {
///     println!("{} -> {:?}", branch.shorthand, branch.upstream_ahead_behind);
/// }
/// ```
pub async fn build_snapshot(
    path: &Path,
    options: &SnapshotOptions,
) -> Result<Snapshot, SnapshotError> {
    match options.timeout {
        Some(limit) => tokio::time::timeout(limit, assemble(path, options))
            .await
            .map_err(|_| SnapshotError::Timeout(limit))?,
        None => assemble(path, options).await,
    }
}

async fn assemble(path: &Path, options: &SnapshotOptions) -> Result<Snapshot, SnapshotError> {
    let path = path.to_path_buf();

    // Head state gates the status scan, so it is read before the fan-out.
    let head = run_facet(Facet::Head, path.clone(), |git| git.head_state()).await?;
    debug!(
        path = %path.display(),
        unborn = head.unborn,
        detached = head.detached,
        state = %head.state,
        "head state"
    );

    let statuses = async {
        if head.unborn {
            return Ok::<_, SnapshotError>(Vec::new());
        }
        run_facet(Facet::Statuses, path.clone(), |git| git.statuses()).await
    };

    let references = async {
        let mut references =
            run_facet(Facet::References, path.clone(), |git| git.references()).await?;
        references.sort_by(|a, b| a.name.cmp(&b.name));
        upstream::fill_ahead_behind(&path, &mut references, options.ahead_behind_jobs).await?;
        Ok::<_, SnapshotError>(references)
    };

    let stashes = run_facet(Facet::Stashes, path.clone(), |git| git.stashes());

    let (statuses, references, stashes) = tokio::try_join!(statuses, references, stashes)
        .inspect_err(|e| warn!(path = %path.display(), error = %e, "snapshot failed"))?;

    Ok(Snapshot {
        path,
        unborn: head.unborn,
        detached: head.detached,
        state: head.state,
        statuses,
        references,
        stashes,
    })
}

/// Run one facet on a blocking task with a fresh repository handle.
async fn run_facet<T, F>(facet: Facet, path: PathBuf, read: F) -> Result<T, SnapshotError>
where
    T: Send + 'static,
    F: FnOnce(&mut Git) -> Result<T, GitError> + Send + 'static,
{
    let joined = tokio::task::spawn_blocking(move || {
        let mut git = Git::open(&path).map_err(SnapshotError::Open)?;
        read(&mut git).map_err(|source| SnapshotError::Facet { facet, source })
    })
    .await;

    match joined {
        Ok(result) => result,
        Err(e) => Err(SnapshotError::TaskFailed {
            facet,
            message: e.to_string(),
        }),
    }
}
