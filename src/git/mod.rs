//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. All repository reads flow
//! through this interface. No other module should import `git2`.
//!
//! # Responsibilities
//!
//! - Repository opening
//! - Head and operation state detection
//! - Working-tree status
//! - Reference enumeration and resolution (upstream, commit, tag peeling)
//! - Stash enumeration
//! - Ahead/behind graph queries
//!
//! # Invariants
//!
//! - Read-only: no ref, index, or worktree mutation
//! - No other module calls git2 directly
//! - All operations return owned, strongly typed records

mod interface;

pub use interface::{
    CommitInfo, Git, GitError, GitState, HeadState, RefKind, Reference, StashEntry, StatusEntry,
};
