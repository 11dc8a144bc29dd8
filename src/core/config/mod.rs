//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! repolint has two configuration scopes:
//! - **Global**: User-level settings (discovery, concurrency, defaults)
//! - **Repo**: Per-repository rule overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file (rule settings only)
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$REPOLINT_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/repolint/config.toml`
//! 3. `~/.repolint/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use repolint::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("stale after {} days", config.stale_days());
//! println!("timeout: {:?}", config.timeout());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Default stale threshold for the HEAD branch.
pub const DEFAULT_STALE_DAYS: u32 = 30;

/// Default cap on concurrent ahead/behind computations.
pub const DEFAULT_AHEAD_BEHIND_JOBS: usize = 8;

/// Default per-repository snapshot timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Directory names skipped during discovery unless configured otherwise.
pub const DEFAULT_IGNORE: &[&str] = &["node_modules"];

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded global configuration.
///
/// Accessors apply defaults for anything left unset.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Path to the global config file (if loaded)
    path: Option<PathBuf>,
}

/// Rule settings in effect for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSettings {
    /// Rules to leave out of the registry.
    pub disabled_rules: Vec<String>,
    /// Stale threshold in days.
    pub stale_days: u32,
}

impl Config {
    /// Load configuration.
    ///
    /// When `explicit` is given, that file must exist. Otherwise the standard
    /// locations are searched and a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed,
    /// or validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_global(),
        };

        let global = match &path {
            Some(path) => read_toml::<GlobalConfig>(path)?,
            None => GlobalConfig::default(),
        };
        global.validate()?;

        Ok(Self { global, path })
    }

    /// Search the standard global config locations.
    fn find_global() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("REPOLINT_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("repolint/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".repolint/config.toml"))
            .filter(|path| path.exists())
    }

    /// Load the repo config for a repository, if it has one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed or invalid.
    pub fn load_repo(repo_path: &Path) -> Result<Option<RepoConfig>, ConfigError> {
        let path = Self::repo_config_path(repo_path);
        if !path.exists() {
            return Ok(None);
        }

        let config = read_toml::<RepoConfig>(&path)?;
        config.validate()?;
        Ok(Some(config))
    }

    /// Get the canonical path for repo config.
    ///
    /// Returns `.git/repolint/config.toml` relative to the given repo path.
    pub fn repo_config_path(repo_path: &Path) -> PathBuf {
        repo_path.join(".git/repolint/config.toml")
    }

    /// Path of the loaded global config file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Directory basenames to skip during discovery.
    pub fn ignore(&self) -> Vec<String> {
        match &self.global.ignore {
            Some(ignore) => ignore.clone(),
            None => DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Stale threshold in days.
    pub fn stale_days(&self) -> u32 {
        self.global.stale_days.unwrap_or(DEFAULT_STALE_DAYS)
    }

    /// Cap on concurrent ahead/behind computations.
    pub fn ahead_behind_jobs(&self) -> usize {
        self.global
            .ahead_behind_jobs
            .unwrap_or(DEFAULT_AHEAD_BEHIND_JOBS)
    }

    /// Per-repository snapshot timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.global.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Whether "not a repository" failures are classified as safe.
    pub fn not_repo_safe(&self) -> bool {
        self.global.not_repo_safe.unwrap_or(false)
    }

    /// Rule settings for a repository, with repo overrides applied.
    pub fn rule_settings(&self, repo: Option<&RepoConfig>) -> RuleSettings {
        let disabled_rules = repo
            .and_then(|r| r.disabled_rules.clone())
            .or_else(|| self.global.disabled_rules.clone())
            .unwrap_or_default();
        let stale_days = repo
            .and_then(|r| r.stale_days)
            .unwrap_or_else(|| self.stale_days());

        RuleSettings {
            disabled_rules,
            stale_days,
        }
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    mod defaults {
        use super::*;

        #[test]
        fn accessors_fall_back_to_defaults() {
            let config = Config::default();
            assert_eq!(config.stale_days(), DEFAULT_STALE_DAYS);
            assert_eq!(config.ahead_behind_jobs(), DEFAULT_AHEAD_BEHIND_JOBS);
            assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
            assert_eq!(config.ignore(), vec!["node_modules".to_string()]);
            assert!(!config.not_repo_safe());
            assert!(config.path().is_none());
        }

        #[test]
        fn rule_settings_without_overrides() {
            let settings = Config::default().rule_settings(None);
            assert!(settings.disabled_rules.is_empty());
            assert_eq!(settings.stale_days, DEFAULT_STALE_DAYS);
        }
    }

    mod loading {
        use super::*;

        #[test]
        fn explicit_file_is_loaded() {
            let dir = TempDir::new().unwrap();
            let path = write(&dir, "config.toml", "stale_days = 7\nignore = []\n");

            let config = Config::load(Some(&path)).unwrap();
            assert_eq!(config.stale_days(), 7);
            assert!(config.ignore().is_empty());
            assert_eq!(config.path(), Some(path.as_path()));
        }

        #[test]
        fn explicit_missing_file_is_an_error() {
            let dir = TempDir::new().unwrap();
            let result = Config::load(Some(&dir.path().join("missing.toml")));
            assert!(matches!(result, Err(ConfigError::ReadError { .. })));
        }

        #[test]
        fn malformed_file_is_a_parse_error() {
            let dir = TempDir::new().unwrap();
            let path = write(&dir, "config.toml", "stale_days = \"soon\"");
            let result = Config::load(Some(&path));
            assert!(matches!(result, Err(ConfigError::ParseError { .. })));
        }

        #[test]
        fn invalid_value_is_rejected() {
            let dir = TempDir::new().unwrap();
            let path = write(&dir, "config.toml", "disabled_rules = [\"bogus\"]");
            let result = Config::load(Some(&path));
            assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
        }
    }

    mod repo_overrides {
        use super::*;

        #[test]
        fn missing_repo_config_is_none() {
            let dir = TempDir::new().unwrap();
            assert!(Config::load_repo(dir.path()).unwrap().is_none());
        }

        #[test]
        fn repo_config_overrides_global() {
            let dir = TempDir::new().unwrap();
            write(
                &dir,
                ".git/repolint/config.toml",
                "disabled_rules = [\"no-stash\"]\nstale_days = 90\n",
            );

            let repo = Config::load_repo(dir.path()).unwrap();
            let config = Config {
                global: GlobalConfig {
                    disabled_rules: Some(vec!["upstream".into()]),
                    stale_days: Some(10),
                    ..Default::default()
                },
                path: None,
            };

            let settings = config.rule_settings(repo.as_ref());
            assert_eq!(settings.disabled_rules, vec!["no-stash".to_string()]);
            assert_eq!(settings.stale_days, 90);
        }

        #[test]
        fn global_applies_when_repo_silent() {
            let config = Config {
                global: GlobalConfig {
                    disabled_rules: Some(vec!["upstream".into()]),
                    ..Default::default()
                },
                path: None,
            };
            let settings = config.rule_settings(Some(&RepoConfig::default()));
            assert_eq!(settings.disabled_rules, vec!["upstream".to_string()]);
        }
    }
}
