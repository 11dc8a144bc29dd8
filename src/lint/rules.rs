//! lint::rules
//!
//! The built-in policies. Each rule is a stateless predicate over the
//! snapshot that reports one failure per offending item.

use chrono::{DateTime, Duration, Utc};

use super::{Reporter, Rule, RuleError};
use crate::core::config::DEFAULT_STALE_DAYS;
use crate::engine::Snapshot;

/// Every built-in rule name, in registry order.
pub const BUILTIN_RULE_NAMES: &[&str] = &[
    "no-uncommitted",
    "no-detached",
    "no-unborn",
    "upstream",
    "no-ahead",
    "no-behind",
    "no-stash",
    "no-stale",
];

/// Instantiate every built-in rule, in registry order.
pub fn builtin(stale_days: u32) -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(NoUncommitted),
        Box::new(NoDetached),
        Box::new(NoUnborn),
        Box::new(Upstream),
        Box::new(NoAhead),
        Box::new(NoBehind),
        Box::new(NoStash),
        Box::new(NoStale::new(stale_days)),
    ]
}

/// One failure per modified or untracked path.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUncommitted;

impl Rule for NoUncommitted {
    fn name(&self) -> &'static str {
        "no-uncommitted"
    }

    fn evaluate(&self, reporter: &Reporter<'_>, snapshot: &Snapshot) -> Result<(), RuleError> {
        for entry in &snapshot.statuses {
            reporter.fail_with(entry.path.as_str());
        }
        Ok(())
    }
}

/// HEAD must point at a branch.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDetached;

impl Rule for NoDetached {
    fn name(&self) -> &'static str {
        "no-detached"
    }

    fn evaluate(&self, reporter: &Reporter<'_>, snapshot: &Snapshot) -> Result<(), RuleError> {
        if snapshot.detached {
            reporter.fail();
        }
        Ok(())
    }
}

/// HEAD must have at least one commit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUnborn;

impl Rule for NoUnborn {
    fn name(&self) -> &'static str {
        "no-unborn"
    }

    fn evaluate(&self, reporter: &Reporter<'_>, snapshot: &Snapshot) -> Result<(), RuleError> {
        if snapshot.unborn {
            reporter.fail();
        }
        Ok(())
    }
}

/// Every local branch must track something.
#[derive(Debug, Clone, Copy, Default)]
pub struct Upstream;

impl Rule for Upstream {
    fn name(&self) -> &'static str {
        "upstream"
    }

    fn evaluate(&self, reporter: &Reporter<'_>, snapshot: &Snapshot) -> Result<(), RuleError> {
        for branch in snapshot.branches().filter(|b| b.upstream.is_none()) {
            reporter.fail_with(branch.shorthand.as_str());
        }
        Ok(())
    }
}

/// No unpushed commits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAhead;

impl Rule for NoAhead {
    fn name(&self) -> &'static str {
        "no-ahead"
    }

    fn evaluate(&self, reporter: &Reporter<'_>, snapshot: &Snapshot) -> Result<(), RuleError> {
        for reference in &snapshot.references {
            if let Some(counts) = reference.upstream_ahead_behind {
                if counts.ahead != 0 {
                    reporter.fail_with(format!(
                        "{} is ahead by {}",
                        reference.shorthand,
                        commits(counts.ahead)
                    ));
                }
            }
        }
        Ok(())
    }
}

/// No unpulled commits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBehind;

impl Rule for NoBehind {
    fn name(&self) -> &'static str {
        "no-behind"
    }

    fn evaluate(&self, reporter: &Reporter<'_>, snapshot: &Snapshot) -> Result<(), RuleError> {
        for reference in &snapshot.references {
            if let Some(counts) = reference.upstream_ahead_behind {
                if counts.behind != 0 {
                    reporter.fail_with(format!(
                        "{} is behind by {}",
                        reference.shorthand,
                        commits(counts.behind)
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Stashes are forgotten work.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStash;

impl Rule for NoStash {
    fn name(&self) -> &'static str {
        "no-stash"
    }

    fn evaluate(&self, reporter: &Reporter<'_>, snapshot: &Snapshot) -> Result<(), RuleError> {
        for stash in &snapshot.stashes {
            reporter.fail_with(stash.message.as_str());
        }
        Ok(())
    }
}

/// The HEAD branch must have been committed to recently.
///
/// A commit exactly `max_age` old is not stale.
#[derive(Debug, Clone, Copy)]
pub struct NoStale {
    max_age: Duration,
    now: Option<DateTime<Utc>>,
}

impl Default for NoStale {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_DAYS)
    }
}

impl NoStale {
    /// Stale after `days` days.
    pub fn new(days: u32) -> Self {
        Self {
            max_age: Duration::days(i64::from(days)),
            now: None,
        }
    }

    /// Evaluate against a fixed clock instead of the current time.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

impl Rule for NoStale {
    fn name(&self) -> &'static str {
        "no-stale"
    }

    fn evaluate(&self, reporter: &Reporter<'_>, snapshot: &Snapshot) -> Result<(), RuleError> {
        let now = self.now.unwrap_or_else(Utc::now);
        let Some(head) = snapshot.head_branch() else {
            return Ok(());
        };
        let Some(commit) = &head.commit else {
            return Ok(());
        };
        if is_stale(commit.date, now, self.max_age) {
            reporter.fail_with(format!(
                "{} last committed on {}",
                head.shorthand,
                commit.date.to_rfc3339()
            ));
        }
        Ok(())
    }
}

/// Strictly older than `max_age`.
pub fn is_stale(date: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    now.signed_duration_since(date) > max_age
}

fn commits(n: usize) -> String {
    if n == 1 {
        "1 commit".to_string()
    } else {
        format!("{} commits", n)
    }
}
