//! Configuration management.
//!
//! Values come from an optional file with the environment layered on top.
//! Environment keys use the `WSACCESS` prefix and `__` as the nesting
//! separator, e.g. `WSACCESS_SYNC__REFRESH_INTERVAL=5m`.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::telemetry::LoggingConfig;
use crate::workspace::{BuildOptions, RootPolicy, WorkspaceScope};

const ENV_PREFIX: &str = "WSACCESS";

/// Main configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Refresh and fetch behaviour
    #[serde(default)]
    pub sync: SyncConfig,

    /// Permission namespace and hierarchy validation
    #[serde(default)]
    pub access: AccessConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Interval between periodic workspace refreshes
    #[serde(default = "default_refresh_interval", with = "humantime_serde")]
    pub refresh_interval: Duration,

    /// Upper bound on a single fetch; unset leaves it to the collaborator
    #[serde(default, with = "humantime_serde")]
    pub fetch_timeout: Option<Duration>,

    /// Refresh immediately when the periodic task starts
    #[serde(default = "default_refresh_on_start")]
    pub refresh_on_start: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
            fetch_timeout: None,
            refresh_on_start: default_refresh_on_start(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Application part of the workspace permission namespace
    #[serde(default = "default_application")]
    pub application: String,

    /// Resource part of the workspace permission namespace
    #[serde(default = "default_resource")]
    pub resource: String,

    /// What to do when more than one record has no parent
    #[serde(default)]
    pub root_policy: RootPolicy,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            application: default_application(),
            resource: default_resource(),
            root_policy: RootPolicy::default(),
        }
    }
}

impl AccessConfig {
    pub fn scope(&self) -> WorkspaceScope {
        WorkspaceScope::new(&self.application, &self.resource)
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions::default().with_root_policy(self.root_policy)
    }
}

// Default value functions
fn default_refresh_interval() -> Duration { Duration::from_secs(600) }
fn default_refresh_on_start() -> bool { true }
fn default_application() -> String { "inventory".to_string() }
fn default_resource() -> String { "groups".to_string() }

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(environment())
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Load from a specific file path, with the environment taking precedence.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::LogFormat;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.sync.refresh_interval, Duration::from_secs(600));
        assert!(config.sync.fetch_timeout.is_none());
        assert!(config.sync.refresh_on_start);
        assert_eq!(config.access.scope(), WorkspaceScope::default());
        assert_eq!(config.access.root_policy, RootPolicy::Strict);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[sync]
refresh_interval = "5m"
fetch_timeout = "30s"

[access]
root_policy = "first_wins"

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.sync.refresh_interval, Duration::from_secs(300));
        assert_eq!(config.sync.fetch_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.access.root_policy, RootPolicy::FirstWins);
        assert_eq!(config.access.application, "inventory");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = Config::from_file("/nonexistent/wsaccess.toml").unwrap_err();
        assert!(err.code().category() == "configuration");
    }
}
