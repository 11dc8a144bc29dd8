//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to all Git reads in repolint.
//! It opens repositories, reads head and operation state, and turns raw git2
//! handles into owned records the rest of the crate can share freely.
//!
//! # Architecture
//!
//! The `Git` struct is the only way to interact with a Git repository.
//! No other module should import `git2` directly. This ensures:
//!
//! - Consistent error handling across all Git operations
//! - Owned, `Send + Sync` records at the boundary (no borrowed git2 handles)
//! - Read-only access: nothing here mutates refs, the index, or the worktree
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Path is not a Git repository
//! - [`GitError::BareRepo`]: Repository has no working directory
//! - [`GitError::ObjectNotFound`]: Requested object does not exist
//! - [`GitError::Internal`]: Anything else libgit2 reports
//!
//! Some absences are not errors at all: a branch without an upstream, or a
//! broken annotated tag, resolve to "no value" and are logged at debug level.
//!
//! # Example
//!
//! ```ignore
//! use repolint::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! for reference in git.references()? {
//!     println!("{} -> {:?}", reference.shorthand, reference.upstream);
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::core::types::{AheadBehind, Oid, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Path is not a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was opened
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Permission or filesystem error.
    #[error("repository access error: {message}")]
    AccessError {
        /// Description of the error
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::ObjectNotFound {
                oid: context.to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            git2::ErrorCode::Locked => GitError::AccessError {
                message: format!("repository is locked: {}", err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
        }
    }
}

/// State of in-progress Git operations.
///
/// This enum represents the various states a Git repository can be in
/// when an operation is paused (usually due to conflicts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "operation")]
pub enum GitState {
    /// No operation in progress.
    Clean,

    /// Rebase in progress.
    Rebase {
        /// Current step in the rebase (1-indexed), if available.
        current: Option<usize>,
        /// Total steps in the rebase, if available.
        total: Option<usize>,
    },

    /// Merge in progress.
    Merge,

    /// Cherry-pick in progress.
    CherryPick,

    /// Revert in progress.
    Revert,

    /// Bisect in progress.
    Bisect,

    /// Apply mailbox in progress.
    ApplyMailbox,
}

impl GitState {
    /// Get a human-readable description of the state.
    pub fn description(&self) -> &'static str {
        match self {
            GitState::Clean => "clean",
            GitState::Rebase { .. } => "rebase",
            GitState::Merge => "merge",
            GitState::CherryPick => "cherry-pick",
            GitState::Revert => "revert",
            GitState::Bisect => "bisect",
            GitState::ApplyMailbox => "apply-mailbox",
        }
    }
}

impl std::fmt::Display for GitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitState::Rebase {
                current: Some(c),
                total: Some(t),
            } => write!(f, "rebase ({}/{})", c, t),
            _ => write!(f, "{}", self.description()),
        }
    }
}

/// Where HEAD points and what the repository is in the middle of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadState {
    /// HEAD names a branch that has no commits yet.
    pub unborn: bool,
    /// HEAD points directly at a commit.
    pub detached: bool,
    /// In-progress operation, if any.
    pub state: GitState,
}

/// One working-tree status entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    /// Path relative to the working directory
    pub path: String,
}

/// Whether a reference points at an object or at another reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Direct,
    Symbolic,
}

/// Commit details attached to branch references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    /// The commit OID
    pub oid: Oid,
    /// Author as `Name <email>`
    pub author: String,
    /// Committer as `Name <email>`
    pub committer: String,
    /// Full commit message
    pub message: String,
    /// First line of the commit message
    pub summary: String,
    /// Committer timestamp
    pub date: chrono::DateTime<chrono::Utc>,
}

/// A resolved reference record.
///
/// Produced by [`Git::references`]. `upstream_ahead_behind` is always `None`
/// here; it is filled in by the upstream matcher once every reference is
/// known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// Fully qualified name (e.g. `refs/heads/main`)
    pub name: String,
    /// Display form (e.g. `main`, `origin/main`)
    pub shorthand: String,
    /// Direct target; `None` for symbolic references
    pub target: Option<Oid>,
    /// Direct or symbolic
    pub kind: RefKind,
    /// Branch that HEAD points to
    pub is_head: bool,
    /// Lives under `refs/heads/`
    pub is_branch: bool,
    /// Lives under `refs/remotes/`
    pub is_remote: bool,
    /// Configured upstream reference name, for branches
    pub upstream: Option<String>,
    /// Divergence from the upstream, when it could be computed
    pub upstream_ahead_behind: Option<AheadBehind>,
    /// Commit the branch points at
    pub commit: Option<CommitInfo>,
}

/// One entry of the stash stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StashEntry {
    /// Stack position, 0 = most recent
    pub index: usize,
    /// Stash message
    pub message: String,
    /// Stash commit object id
    pub id: Oid,
}

/// The Git interface.
///
/// This is the **single point of interaction** with Git. No other module
/// should import `git2` directly.
///
/// A `Git` wraps one `git2::Repository`, which is `Send` but not `Sync`;
/// concurrent readers each open their own handle.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening
    // =========================================================================

    /// Open the repository at exactly `path`.
    ///
    /// Unlike discovery, parent directories are not searched: a plain
    /// directory inside some other repository is not a repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if `path` is not a repository
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::open(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    // =========================================================================
    // Head and State Detection
    // =========================================================================

    /// Read where HEAD points and the current operation state.
    pub fn head_state(&self) -> Result<HeadState, GitError> {
        let unborn = match self.repo.head() {
            Ok(_) => false,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => true,
            Err(e) => return Err(GitError::from_git2(e, "HEAD")),
        };

        let detached = self
            .repo
            .head_detached()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;

        Ok(HeadState {
            unborn,
            detached,
            state: self.state(),
        })
    }

    /// Get the current Git state (rebase, merge, etc.).
    pub fn state(&self) -> GitState {
        match self.repo.state() {
            git2::RepositoryState::Clean => GitState::Clean,
            git2::RepositoryState::Rebase
            | git2::RepositoryState::RebaseInteractive
            | git2::RepositoryState::RebaseMerge => {
                let (current, total) = self.read_rebase_progress();
                GitState::Rebase { current, total }
            }
            git2::RepositoryState::Merge => GitState::Merge,
            git2::RepositoryState::CherryPick | git2::RepositoryState::CherryPickSequence => {
                GitState::CherryPick
            }
            git2::RepositoryState::Revert | git2::RepositoryState::RevertSequence => {
                GitState::Revert
            }
            git2::RepositoryState::Bisect => GitState::Bisect,
            git2::RepositoryState::ApplyMailbox | git2::RepositoryState::ApplyMailboxOrRebase => {
                GitState::ApplyMailbox
            }
        }
    }

    /// Read rebase progress from .git/rebase-merge or .git/rebase-apply.
    fn read_rebase_progress(&self) -> (Option<usize>, Option<usize>) {
        let git_dir = self.repo.path();

        let read_number = |path: PathBuf| -> Option<usize> {
            std::fs::read_to_string(path)
                .ok()
                .and_then(|s| s.trim().parse().ok())
        };

        let rebase_merge = git_dir.join("rebase-merge");
        if rebase_merge.exists() {
            return (
                read_number(rebase_merge.join("msgnum")),
                read_number(rebase_merge.join("end")),
            );
        }

        let rebase_apply = git_dir.join("rebase-apply");
        if rebase_apply.exists() {
            return (
                read_number(rebase_apply.join("next")),
                read_number(rebase_apply.join("last")),
            );
        }

        (None, None)
    }

    // =========================================================================
    // Working Tree Status
    // =========================================================================

    /// List working-tree status entries, including untracked files.
    ///
    /// Untracked directories are reported as a single entry rather than
    /// walked, so an unignored dependency tree or a nested repository does
    /// not turn this into a full filesystem scan.
    pub fn statuses(&self) -> Result<Vec<StatusEntry>, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(false)
            .include_ignored(false);

        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;

        Ok(statuses
            .iter()
            .map(|entry| StatusEntry {
                path: String::from_utf8_lossy(entry.path_bytes()).into_owned(),
            })
            .collect())
    }

    // =========================================================================
    // References
    // =========================================================================

    /// Enumerate every reference and resolve it into a [`Reference`].
    ///
    /// Missing upstreams and broken tags resolve to absent values. Errors
    /// reading the reference list itself, or looking up a commit that
    /// should exist, are returned.
    pub fn references(&self) -> Result<Vec<Reference>, GitError> {
        let head_branch = self.head_branch_name();

        let refs = self.repo.references().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;

        let mut resolved = Vec::new();
        for reference in refs {
            let reference = reference.map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;
            resolved.push(self.resolve_reference(&reference, head_branch.as_deref())?);
        }

        Ok(resolved)
    }

    /// Name of the branch HEAD points to, even if it is unborn.
    fn head_branch_name(&self) -> Option<String> {
        self.repo
            .find_reference("HEAD")
            .ok()
            .and_then(|head| head.symbolic_target().map(String::from))
    }

    fn resolve_reference(
        &self,
        reference: &git2::Reference<'_>,
        head_branch: Option<&str>,
    ) -> Result<Reference, GitError> {
        let name = String::from_utf8_lossy(reference.name_bytes()).into_owned();
        let shorthand = String::from_utf8_lossy(reference.shorthand_bytes()).into_owned();
        let is_branch = reference.is_branch();
        let is_remote = reference.is_remote();
        let is_head = is_branch && head_branch == Some(name.as_str());

        let kind = match reference.kind() {
            Some(git2::ReferenceType::Symbolic) => RefKind::Symbolic,
            _ => RefKind::Direct,
        };
        let raw_target = reference.target();
        let target = raw_target
            .map(|oid| Oid::new(oid.to_string()))
            .transpose()?;

        let (upstream, commit) = if is_branch {
            let upstream = self.upstream_name(&name);
            let commit = match raw_target {
                Some(oid) => {
                    let commit_id = self.peel_tag(&name, oid);
                    self.commit_info(&name, commit_id)?
                }
                None => None,
            };
            (upstream, commit)
        } else {
            (None, None)
        };

        Ok(Reference {
            name,
            shorthand,
            target,
            kind,
            is_head,
            is_branch,
            is_remote,
            upstream,
            upstream_ahead_behind: None,
            commit,
        })
    }

    /// Name of the upstream reference a branch tracks.
    ///
    /// The upstream must resolve to an existing reference: a configured
    /// upstream whose remote-tracking ref was pruned is absent.
    fn upstream_name(&self, refname: &str) -> Option<String> {
        let name = refname.strip_prefix("refs/heads/")?;
        let upstream = self
            .repo
            .find_branch(name, git2::BranchType::Local)
            .and_then(|branch| branch.upstream());

        match upstream {
            Ok(upstream) => upstream.get().name().map(String::from),
            Err(e) => {
                debug!(branch = refname, error = e.message(), "no upstream");
                None
            }
        }
    }

    /// Follow one annotated-tag hop, falling back to the reference's own
    /// target when the tag cannot be read.
    fn peel_tag(&self, refname: &str, target: git2::Oid) -> git2::Oid {
        let is_tag = self
            .repo
            .find_object(target, None)
            .map(|object| object.kind() == Some(git2::ObjectType::Tag))
            .unwrap_or(false);
        if !is_tag {
            return target;
        }
        match self.repo.find_tag(target) {
            Ok(tag) => tag.target_id(),
            Err(e) => {
                debug!(reference = refname, error = e.message(), "tag dereference failed");
                target
            }
        }
    }

    /// Look up a commit, returning `None` when the object is missing or is
    /// not a commit.
    fn commit_info(&self, refname: &str, oid: git2::Oid) -> Result<Option<CommitInfo>, GitError> {
        let commit = match self.repo.find_commit(oid) {
            Ok(commit) => commit,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                debug!(reference = refname, %oid, "target is not a commit");
                return Ok(None);
            }
            Err(e) => return Err(GitError::from_git2(e, &oid.to_string())),
        };

        let author = commit.author();
        let committer = commit.committer();
        let date = chrono::DateTime::from_timestamp(committer.when().seconds(), 0)
            .unwrap_or_default();

        let info = CommitInfo {
            oid: Oid::new(oid.to_string())?,
            author: format_signature(&author),
            committer: format_signature(&committer),
            message: commit.message().unwrap_or("").to_string(),
            summary: commit.summary().unwrap_or("").to_string(),
            date,
        };
        Ok(Some(info))
    }

    // =========================================================================
    // Stashes
    // =========================================================================

    /// List the stash stack, most recent first.
    ///
    /// Needs `&mut self` because libgit2 iterates stashes through a mutable
    /// repository handle.
    pub fn stashes(&mut self) -> Result<Vec<StashEntry>, GitError> {
        let mut raw = Vec::new();
        self.repo
            .stash_foreach(|index, message, oid| {
                raw.push((index, message.to_string(), *oid));
                true
            })
            .map_err(|e| GitError::Internal {
                message: format!("stash enumeration failed: {}", e.message()),
            })?;

        raw.into_iter()
            .map(|(index, message, oid)| {
                Ok(StashEntry {
                    index,
                    message,
                    id: Oid::new(oid.to_string())?,
                })
            })
            .collect()
    }

    // =========================================================================
    // Ancestry Queries
    // =========================================================================

    /// Count commits unique to `local` and to `upstream`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let counts = git.ahead_behind(&branch_tip, &remote_tip)?;
    /// println!("ahead {}, behind {}", counts.ahead, counts.behind);
    /// ```
    pub fn ahead_behind(&self, local: &Oid, upstream: &Oid) -> Result<AheadBehind, GitError> {
        let local_oid = git2::Oid::from_str(local.as_str())
            .map_err(|e| GitError::from_git2(e, local.as_str()))?;
        let upstream_oid = git2::Oid::from_str(upstream.as_str())
            .map_err(|e| GitError::from_git2(e, upstream.as_str()))?;

        let (ahead, behind) = self
            .repo
            .graph_ahead_behind(local_oid, upstream_oid)
            .map_err(|e| GitError::Internal {
                message: format!("ahead/behind {}..{}: {}", local, upstream, e.message()),
            })?;

        Ok(AheadBehind::new(ahead, behind))
    }
}

fn format_signature(signature: &git2::Signature<'_>) -> String {
    let name = String::from_utf8_lossy(signature.name_bytes());
    let email = String::from_utf8_lossy(signature.email_bytes());
    format!("{} <{}>", name, email)
}
