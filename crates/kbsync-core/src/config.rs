//! Configuration module for kbsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation and defaults. The same file drives the daemon and
//! the CLI.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::{Provider, UserId};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for kbsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    /// Per-provider overrides, keyed by provider name.
    pub providers: BTreeMap<Provider, ProviderSettings>,
    /// (user, provider) pairs the scheduler reconciles.
    pub connections: Vec<ConnectionConfig>,
}

/// Scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between scheduler ticks.
    pub poll_interval: u64,
    /// Hard limit in seconds for a single reconciliation invocation.
    pub session_timeout: u64,
    /// Maximum number of invocations running at once.
    pub max_concurrent: usize,
}

/// Mirror database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

/// Overrides for a single provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// API base URL, replacing the provider's public endpoint.
    pub base_url: Option<String>,
}

/// A (user, provider) connection to reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub user_id: UserId,
    pub provider: Provider,
    /// Access token given inline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Name of an environment variable holding the access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

impl ConnectionConfig {
    /// Resolve the access token, reading `token_env` if no inline token is set.
    pub fn resolve_token(&self) -> anyhow::Result<String> {
        if let Some(token) = &self.access_token {
            return Ok(token.clone());
        }
        match &self.token_env {
            Some(var) => std::env::var(var).with_context(|| {
                format!(
                    "environment variable {var} for {} connection of {} is not set",
                    self.provider, self.user_id
                )
            }),
            None => anyhow::bail!(
                "{} connection of {} has neither access_token nor token_env",
                self.provider,
                self.user_id
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/kbsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("kbsync")
            .join("config.yaml")
    }

    /// Configured base URL override for `provider`, if any.
    pub fn base_url(&self, provider: Provider) -> Option<&str> {
        self.providers
            .get(&provider)
            .and_then(|settings| settings.base_url.as_deref())
    }

    /// Connections configured for `user_id`.
    pub fn connections_for(&self, user_id: &UserId) -> impl Iterator<Item = &ConnectionConfig> {
        let user_id = *user_id;
        self.connections.iter().filter(move |c| c.user_id == user_id)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: 300,
            session_timeout: 300,
            max_concurrent: 4,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("kbsync")
                .join("kbsync.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.poll_interval"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.poll_interval == 0 {
            errors.push(ValidationError {
                field: "sync.poll_interval".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.session_timeout == 0 {
            errors.push(ValidationError {
                field: "sync.session_timeout".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.max_concurrent == 0 {
            errors.push(ValidationError {
                field: "sync.max_concurrent".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- database ---
        if self.database.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "database.path".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        // --- providers ---
        for (provider, settings) in &self.providers {
            if let Some(base_url) = &settings.base_url {
                if let Err(e) = url::Url::parse(base_url) {
                    errors.push(ValidationError {
                        field: format!("providers.{provider}.base_url"),
                        message: format!("invalid URL '{base_url}': {e}"),
                    });
                }
            }
        }

        // --- connections ---
        let mut seen = HashSet::new();
        for (i, conn) in self.connections.iter().enumerate() {
            match (&conn.access_token, &conn.token_env) {
                (None, None) => errors.push(ValidationError {
                    field: format!("connections[{i}]"),
                    message: "one of access_token or token_env is required".into(),
                }),
                (Some(_), Some(_)) => errors.push(ValidationError {
                    field: format!("connections[{i}]"),
                    message: "access_token and token_env are mutually exclusive".into(),
                }),
                _ => {}
            }
            if !seen.insert((conn.user_id, conn.provider)) {
                errors.push(ValidationError {
                    field: format!("connections[{i}]"),
                    message: format!(
                        "duplicate connection for user {} and provider {}",
                        conn.user_id, conn.provider
                    ),
                });
            }
        }

        errors
    }
}
