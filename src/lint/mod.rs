//! lint
//!
//! Rule engine: evaluates independent policies against a snapshot.
//!
//! # Architecture
//!
//! A [`RuleRegistry`] holds boxed [`Rule`] implementations. [`evaluate`]
//! runs every rule against one [`Snapshot`], each on its own scoped thread,
//! and collects what they report into a shared [`FailureSink`].
//!
//! Each rule gets a [`Reporter`] carrying its own name and a handle to the
//! sink. Reporting a failure is the normal way for a rule to say something
//! is wrong; returning an error or panicking means the rule itself broke.
//! Broken rules are turned into a single failure of kind
//! [`FailureKind::Internal`] and never affect their siblings.
//!
//! # Invariants
//!
//! - Rules only read the snapshot
//! - Failures come back ordered by registry position, and in reporting
//!   order within one rule
//! - `all_safe` is true iff every failure is safe (vacuously true when empty)
//!
//! # Example
//!
//! ```ignore
//! use repolint::lint::{evaluate, RuleRegistry};
//!
//! let registry = RuleRegistry::builtin(30);
//! let report = evaluate(&registry, &snapshot);
//! for failure in &report.failures {
//!     println!("{}: {}", failure.rule, failure.message);
//! }
//! ```

pub mod rules;

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::engine::Snapshot;

/// Rule name used for paths that are not usable repositories.
pub const NOT_REPO: &str = "not-repo";

/// Rule name used for a repository whose own config is broken.
pub const CONFIG: &str = "config";

/// Rule name used for a repository that opened but could not be read.
pub const SNAPSHOT: &str = "snapshot";

/// Errors a rule can raise about itself (as opposed to lint failures).
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("{0}")]
    Internal(String),
}

/// What produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// A rule found a policy violation.
    Lint,
    /// A rule broke while evaluating.
    Internal,
    /// The path could not be snapshotted as a repository.
    NotRepo,
    /// The repository's own configuration could not be loaded.
    Config,
    /// The repository opened but its snapshot failed.
    RepoError,
}

/// One reported failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Name of the rule (or marker) that reported it.
    pub rule: String,
    /// Human-readable detail; may be empty.
    pub message: String,
    /// Non-blocking even though reported.
    pub safe: bool,
    /// Lint failure or something else.
    pub kind: FailureKind,
}

impl Failure {
    /// A blocking lint failure.
    pub fn lint(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
            safe: false,
            kind: FailureKind::Lint,
        }
    }

    /// A failure raised on behalf of a broken rule.
    pub fn internal(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
            safe: false,
            kind: FailureKind::Internal,
        }
    }

    /// Mark this failure as safe.
    pub fn safe(mut self, safe: bool) -> Self {
        self.safe = safe;
        self
    }

    /// Change the failure kind.
    pub fn with_kind(mut self, kind: FailureKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Append-only, thread-safe failure collection shared by one evaluation.
#[derive(Debug, Default)]
pub struct FailureSink {
    failures: Mutex<Vec<Failure>>,
}

impl FailureSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a failure.
    pub fn push(&self, failure: Failure) {
        // A poisoned lock still holds every pushed entry intact.
        let mut failures = self.failures.lock().unwrap_or_else(|p| p.into_inner());
        failures.push(failure);
    }

    /// Consume the sink, returning everything pushed.
    pub fn into_failures(self) -> Vec<Failure> {
        self.failures
            .into_inner()
            .unwrap_or_else(|p| p.into_inner())
    }
}

/// Per-rule reporting handle.
#[derive(Debug, Clone, Copy)]
pub struct Reporter<'a> {
    rule: &'static str,
    sink: &'a FailureSink,
}

impl<'a> Reporter<'a> {
    /// Create a reporter for `rule` writing to `sink`.
    pub fn new(rule: &'static str, sink: &'a FailureSink) -> Self {
        Self { rule, sink }
    }

    /// Report a failure with no message.
    pub fn fail(&self) {
        self.fail_with("");
    }

    /// Report a blocking failure.
    pub fn fail_with(&self, message: impl Into<String>) {
        self.sink.push(Failure::lint(self.rule, message));
    }

    /// Report a non-blocking failure.
    pub fn fail_safe(&self, message: impl Into<String>) {
        self.sink.push(Failure::lint(self.rule, message).safe(true));
    }
}

/// A named policy evaluated against a snapshot.
///
/// Rules must be stateless with respect to evaluation: the same snapshot
/// always yields the same failures.
pub trait Rule: Send + Sync {
    /// Stable rule name, used in output and configuration.
    fn name(&self) -> &'static str;

    /// Report every violation found in `snapshot`.
    ///
    /// Return `Err` only when the rule itself cannot run.
    fn evaluate(&self, reporter: &Reporter<'_>, snapshot: &Snapshot) -> Result<(), RuleError>;
}

/// An ordered collection of rules.
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl RuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in rule.
    pub fn builtin(stale_days: u32) -> Self {
        Self {
            rules: rules::builtin(stale_days),
        }
    }

    /// Add a rule at the end of the registry.
    pub fn register(&mut self, rule: impl Rule + 'static) -> &mut Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Drop every rule whose name is listed.
    pub fn without(mut self, disabled: &[String]) -> Self {
        self.rules
            .retain(|rule| !disabled.iter().any(|name| name == rule.name()));
        self
    }

    /// Rule names in registry order.
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }
}

/// Aggregated outcome of evaluating a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintReport {
    /// Everything reported, in registry order.
    pub failures: Vec<Failure>,
    /// True iff every failure is safe.
    pub all_safe: bool,
}

impl LintReport {
    /// Build a report, deriving `all_safe`.
    pub fn new(failures: Vec<Failure>) -> Self {
        let all_safe = failures.iter().all(|f| f.safe);
        Self { failures, all_safe }
    }

    /// Report for a path that could not be snapshotted.
    pub fn not_repo(message: impl Into<String>, safe: bool) -> Self {
        Self::new(vec![Failure::lint(NOT_REPO, message)
            .safe(safe)
            .with_kind(FailureKind::NotRepo)])
    }

    /// Report for a repository whose snapshot failed after opening.
    ///
    /// Always blocking, whatever the not-repo policy says.
    pub fn repo_error(message: impl Into<String>) -> Self {
        Self::new(vec![
            Failure::lint(SNAPSHOT, message).with_kind(FailureKind::RepoError)
        ])
    }

    /// Put `failures` ahead of everything already reported.
    pub fn prepend(self, mut failures: Vec<Failure>) -> Self {
        if failures.is_empty() {
            return self;
        }
        failures.extend(self.failures);
        Self::new(failures)
    }

    /// True when nothing was reported.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Evaluate every rule in `registry` against `snapshot`.
///
/// Rules run concurrently. A rule that returns an error or panics produces
/// one [`FailureKind::Internal`] failure; the others are unaffected.
pub fn evaluate(registry: &RuleRegistry, snapshot: &Snapshot) -> LintReport {
    let sink = FailureSink::new();

    std::thread::scope(|scope| {
        let handles: Vec<_> = registry
            .rules
            .iter()
            .map(|rule| {
                let sink = &sink;
                let handle = scope.spawn(move || {
                    let reporter = Reporter::new(rule.name(), sink);
                    rule.evaluate(&reporter, snapshot)
                });
                (rule.name(), handle)
            })
            .collect();

        for (name, handle) in handles {
            let message = match handle.join() {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => format!("internal error: {}", e),
                Err(payload) => {
                    format!("internal error: rule panicked: {}", panic_message(&*payload))
                }
            };
            warn!(rule = name, path = %snapshot.path.display(), %message, "rule failed");
            sink.push(Failure::internal(name, message));
        }
    });

    let order: HashMap<&str, usize> = registry
        .names()
        .into_iter()
        .enumerate()
        .map(|(index, name)| (name, index))
        .rev()
        .collect();

    let mut failures = sink.into_failures();
    failures.sort_by_key(|f| order.get(f.rule.as_str()).copied().unwrap_or(usize::MAX));
    LintReport::new(failures)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitState;
    use std::path::PathBuf;

    fn empty_snapshot() -> Snapshot {
        Snapshot {
            path: PathBuf::from("/repo"),
            unborn: false,
            detached: false,
            state: GitState::Clean,
            statuses: Vec::new(),
            references: Vec::new(),
            stashes: Vec::new(),
        }
    }

    struct Always(&'static str, usize);

    impl Rule for Always {
        fn name(&self) -> &'static str {
            self.0
        }

        fn evaluate(&self, reporter: &Reporter<'_>, _: &Snapshot) -> Result<(), RuleError> {
            for i in 0..self.1 {
                reporter.fail_with(format!("{}", i));
            }
            Ok(())
        }
    }

    struct SafeOnly;

    impl Rule for SafeOnly {
        fn name(&self) -> &'static str {
            "safe-only"
        }

        fn evaluate(&self, reporter: &Reporter<'_>, _: &Snapshot) -> Result<(), RuleError> {
            reporter.fail_safe("just so you know");
            Ok(())
        }
    }

    struct Broken;

    impl Rule for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn evaluate(&self, _: &Reporter<'_>, _: &Snapshot) -> Result<(), RuleError> {
            Err(RuleError::Internal("could not read".into()))
        }
    }

    struct Panics;

    impl Rule for Panics {
        fn name(&self) -> &'static str {
            "panics"
        }

        fn evaluate(&self, _: &Reporter<'_>, _: &Snapshot) -> Result<(), RuleError> {
            panic!("kaboom");
        }
    }

    mod evaluation {
        use super::*;

        #[test]
        fn empty_registry_is_clean_and_safe() {
            let report = evaluate(&RuleRegistry::new(), &empty_snapshot());
            assert!(report.failures.is_empty());
            assert!(report.all_safe);
            assert!(report.is_clean());
        }

        #[test]
        fn failures_follow_registry_order() {
            let mut registry = RuleRegistry::new();
            registry.register(Always("second", 2)).register(Always("first", 3));

            let report = evaluate(&registry, &empty_snapshot());
            let seen: Vec<_> = report
                .failures
                .iter()
                .map(|f| (f.rule.as_str(), f.message.as_str()))
                .collect();
            assert_eq!(
                seen,
                vec![
                    ("second", "0"),
                    ("second", "1"),
                    ("first", "0"),
                    ("first", "1"),
                    ("first", "2"),
                ]
            );
            assert!(!report.all_safe);
        }

        #[test]
        fn safe_failures_keep_report_safe() {
            let mut registry = RuleRegistry::new();
            registry.register(SafeOnly);

            let report = evaluate(&registry, &empty_snapshot());
            assert_eq!(report.failures.len(), 1);
            assert!(report.all_safe);
        }

        #[test]
        fn rule_error_becomes_internal_failure() {
            let mut registry = RuleRegistry::new();
            registry.register(Broken).register(Always("fine", 1));

            let report = evaluate(&registry, &empty_snapshot());
            assert_eq!(report.failures.len(), 2);
            assert_eq!(report.failures[0].kind, FailureKind::Internal);
            assert!(report.failures[0].message.contains("could not read"));
            assert_eq!(report.failures[1].kind, FailureKind::Lint);
        }

        #[test]
        fn panicking_rule_does_not_stop_siblings() {
            let mut registry = RuleRegistry::new();
            registry
                .register(Always("before", 1))
                .register(Panics)
                .register(Always("after", 1));

            let report = evaluate(&registry, &empty_snapshot());
            let rules: Vec<_> = report.failures.iter().map(|f| f.rule.as_str()).collect();
            assert_eq!(rules, vec!["before", "panics", "after"]);
            assert_eq!(report.failures[1].kind, FailureKind::Internal);
            assert!(report.failures[1].message.contains("kaboom"));
            assert!(!report.all_safe);
        }
    }

    mod registry {
        use super::*;

        #[test]
        fn without_drops_named_rules() {
            let mut registry = RuleRegistry::new();
            registry.register(Always("a", 0)).register(Always("b", 0));
            let registry = registry.without(&["a".to_string()]);
            assert_eq!(registry.names(), vec!["b"]);
        }

        #[test]
        fn builtin_registers_every_rule() {
            let registry = RuleRegistry::builtin(30);
            assert_eq!(registry.names(), rules::BUILTIN_RULE_NAMES.to_vec());
        }
    }

    mod reporter {
        use super::*;

        #[test]
        fn fail_without_message_is_empty() {
            let sink = FailureSink::new();
            Reporter::new("no-detached", &sink).fail();
            let failures = sink.into_failures();
            assert_eq!(failures, vec![Failure::lint("no-detached", "")]);
        }

        #[test]
        fn not_repo_report_honours_safety() {
            let report = LintReport::not_repo("not a git repository", true);
            assert_eq!(report.failures[0].rule, NOT_REPO);
            assert_eq!(report.failures[0].kind, FailureKind::NotRepo);
            assert!(report.all_safe);
            assert!(!LintReport::not_repo("x", false).all_safe);
        }

        #[test]
        fn repo_error_report_is_blocking() {
            let report = LintReport::repo_error("failed to read references");
            assert_eq!(report.failures[0].rule, SNAPSHOT);
            assert_eq!(report.failures[0].kind, FailureKind::RepoError);
            assert!(!report.all_safe);
        }

        #[test]
        fn prepend_recomputes_safety() {
            let report = LintReport::new(Vec::new());
            assert!(report.all_safe);
            let report = report.prepend(vec![Failure::lint(CONFIG, "bad toml")
                .with_kind(FailureKind::Config)]);
            assert_eq!(report.failures.len(), 1);
            assert!(!report.all_safe);
        }

        #[test]
        fn failure_builders() {
            let failure = Failure::lint("x", "y")
                .safe(true)
                .with_kind(FailureKind::NotRepo);
            assert!(failure.safe);
            assert_eq!(failure.kind, FailureKind::NotRepo);
        }
    }
}
