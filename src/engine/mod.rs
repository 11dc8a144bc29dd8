//! engine
//!
//! Builds repository snapshots and finds the repositories to build them for.
//!
//! # Architecture
//!
//! ```text
//! discover -> build_snapshot -> Snapshot -> lint::evaluate
//!                  |
//!                  +-- upstream (ahead/behind matcher)
//! ```
//!
//! - [`discover`] - Walks a root directory for repositories
//! - [`snapshot`] - Concurrent, fail-fast snapshot builder
//! - [`upstream`] - Branch/remote pairing and bounded ahead/behind fan-out
//!
//! # Invariants
//!
//! - The engine never mutates a repository
//! - A returned snapshot is complete; partial snapshots are never exposed

pub mod discover;
pub mod snapshot;
pub mod upstream;

pub use discover::discover;
pub use snapshot::{build_snapshot, Facet, Snapshot, SnapshotError, SnapshotOptions};
pub use upstream::{fill_ahead_behind, pair_upstreams, UpstreamPair};
