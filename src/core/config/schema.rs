//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$REPOLINT_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/repolint/config.toml`
//! 3. `~/.repolint/config.toml`
//!
//! # Repo Config
//!
//! Located at `.git/repolint/config.toml` inside each scanned repository.
//!
//! # Validation
//!
//! Config values are validated after parsing (e.g., disabled rules must
//! name a known rule, thresholds must be positive).

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::lint::rules;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// ignore = ["node_modules", "target"]
/// disabled_rules = ["no-stash"]
/// stale_days = 30
/// ahead_behind_jobs = 8
/// timeout_secs = 60
/// not_repo_safe = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Directory basenames skipped during discovery
    pub ignore: Option<Vec<String>>,

    /// Rules removed from the registry
    pub disabled_rules: Option<Vec<String>>,

    /// Age in days after which the HEAD branch is stale
    pub stale_days: Option<u32>,

    /// Cap on concurrent ahead/behind computations per repository
    pub ahead_behind_jobs: Option<usize>,

    /// Per-repository snapshot timeout
    pub timeout_secs: Option<u64>,

    /// Treat "not a repository" as a non-blocking finding
    pub not_repo_safe: Option<bool>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_rule_names(self.disabled_rules.as_deref())?;
        validate_stale_days(self.stale_days)?;

        if self.ahead_behind_jobs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "ahead_behind_jobs must be greater than 0".into(),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// disabled_rules = ["upstream"]
/// stale_days = 90
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Rules removed from the registry for this repository
    pub disabled_rules: Option<Vec<String>>,

    /// Stale threshold for this repository
    pub stale_days: Option<u32>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_rule_names(self.disabled_rules.as_deref())?;
        validate_stale_days(self.stale_days)
    }
}

fn validate_rule_names(names: Option<&[String]>) -> Result<(), ConfigError> {
    for name in names.unwrap_or_default() {
        if !rules::BUILTIN_RULE_NAMES.contains(&name.as_str()) {
            return Err(ConfigError::InvalidValue(format!(
                "unknown rule '{}', must be one of: {}",
                name,
                rules::BUILTIN_RULE_NAMES.join(", ")
            )));
        }
    }
    Ok(())
}

fn validate_stale_days(days: Option<u32>) -> Result<(), ConfigError> {
    if days == Some(0) {
        return Err(ConfigError::InvalidValue(
            "stale_days must be greater than 0".into(),
        ));
    }
    Ok(())
}
