//! engine::upstream
//!
//! Matches branches with their remote-tracking references and computes
//! ahead/behind counts for every matched pair.
//!
//! # Architecture
//!
//! Matching is a pure pass over the resolved reference list:
//! remote-tracking references are indexed by full name (first one seen
//! wins), then every branch with a configured upstream looks its upstream
//! up in that index. Unmatched branches keep `upstream_ahead_behind` empty;
//! a pruned remote is a state other rules report on, not an error.
//!
//! Counting runs one blocking task per pair, at most `jobs` in flight. Every
//! task runs to completion; failures are collected with the branch they
//! belong to and the first one is returned after all tasks finish.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::snapshot::{Facet, SnapshotError};
use crate::core::types::{AheadBehind, Oid};
use crate::git::{Git, GitError, Reference};

/// A branch paired with the remote-tracking reference it follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamPair {
    /// Index of the branch in the reference list.
    pub branch: usize,
    /// Index of the remote-tracking reference.
    pub remote: usize,
}

/// Pair every branch that has an upstream with its remote-tracking ref.
///
/// Duplicate remote names are tolerated: the first occurrence is used and
/// later ones are ignored.
///
/// # Example
///
/// ```ignore
/// let pairs = pair_upstreams(&snapshot.references);
/// for pair in pairs {
///     println!("{} tracks {}", refs[pair.branch].name, refs[pair.remote].name);
/// }
/// ```
pub fn pair_upstreams(references: &[Reference]) -> Vec<UpstreamPair> {
    let mut remotes: HashMap<&str, usize> = HashMap::new();
    for (index, reference) in references.iter().enumerate() {
        if !reference.is_remote {
            continue;
        }
        // TODO: find out why the same remote-tracking name can be listed twice
        if remotes.contains_key(reference.name.as_str()) {
            debug!(reference = %reference.name, "duplicate remote-tracking reference ignored");
        } else {
            remotes.insert(reference.name.as_str(), index);
        }
    }

    let mut pairs = Vec::new();
    for (index, reference) in references.iter().enumerate() {
        if !reference.is_branch {
            continue;
        }
        let Some(upstream) = reference.upstream.as_deref() else {
            continue;
        };
        match remotes.get(upstream) {
            Some(&remote) => pairs.push(UpstreamPair {
                branch: index,
                remote,
            }),
            None => {
                debug!(branch = %reference.name, upstream, "upstream has no remote-tracking ref")
            }
        }
    }

    pairs
}

/// Fill `upstream_ahead_behind` for every matched branch.
///
/// Opens one repository handle per computation, with at most `jobs`
/// computations in flight.
///
/// # Errors
///
/// Returns [`SnapshotError::AheadBehind`] naming the first branch whose
/// counts could not be computed. Other branches still run to completion.
pub async fn fill_ahead_behind(
    path: &Path,
    references: &mut [Reference],
    jobs: usize,
) -> Result<(), SnapshotError> {
    let pairs = pair_upstreams(references);
    if pairs.is_empty() {
        return Ok(());
    }

    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut tasks = JoinSet::new();

    for pair in pairs {
        let branch = &references[pair.branch];
        let remote = &references[pair.remote];
        let (Some(local), Some(upstream)) = (branch.target.clone(), remote.target.clone()) else {
            debug!(branch = %branch.name, "branch or upstream has no direct target");
            continue;
        };

        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| SnapshotError::TaskFailed {
                facet: Facet::References,
                message: e.to_string(),
            })?;
        let path = path.to_path_buf();
        let branch_name = branch.name.clone();
        let upstream_name = remote.name.clone();

        tasks.spawn_blocking(move || {
            let _permit = permit;
            let counts = count(&path, &local, &upstream);
            (pair.branch, branch_name, upstream_name, counts)
        });
    }

    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, branch, _, Ok(counts))) => {
                debug!(%branch, %counts, "ahead/behind");
                references[index].upstream_ahead_behind = Some(counts);
            }
            Ok((_, branch, upstream, Err(source))) => {
                warn!(%branch, %upstream, error = %source, "ahead/behind failed");
                first_error.get_or_insert(SnapshotError::AheadBehind {
                    branch,
                    upstream,
                    source,
                });
            }
            Err(e) => {
                first_error.get_or_insert(SnapshotError::TaskFailed {
                    facet: Facet::References,
                    message: e.to_string(),
                });
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn count(path: &Path, local: &Oid, upstream: &Oid) -> Result<AheadBehind, GitError> {
    Git::open(path)?.ahead_behind(local, upstream)
}
