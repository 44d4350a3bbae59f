pub mod config;
pub mod files;
pub mod notifications;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};

use kbsync_cache::DatabasePool;
use kbsync_core::config::Config;

/// Settings shared by every subcommand
#[derive(Debug, Clone)]
pub struct CliContext {
    pub config_path: PathBuf,
    pub format: crate::output::OutputFormat,
}

impl CliContext {
    /// Loads the configuration, falling back to defaults when the file is missing
    ///
    /// A file that exists but fails to parse is an error.
    pub fn load_config(&self) -> Result<Config> {
        if self.config_path.exists() {
            Config::load(&self.config_path)
        } else {
            tracing::debug!(path = %self.config_path.display(), "No config file, using defaults");
            Ok(Config::default())
        }
    }
}

/// Opens the mirror database configured in `config`
pub async fn open_database(config: &Config) -> Result<DatabasePool> {
    let path = &config.database.path;
    DatabasePool::new(path)
        .await
        .with_context(|| format!("Failed to open database {}", path.display()))
}
