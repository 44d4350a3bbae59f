//! Config command - view, edit and validate the kbsync configuration
//!
//! Provides the `kbsync config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON) with tokens redacted
//! 2. Sets individual scalar values via dot-notation keys
//! 3. Validates the configuration file and reports every error

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use kbsync_core::config::Config;
use kbsync_core::domain::Provider;

use super::CliContext;
use crate::output::get_formatter;

const REDACTED: &str = "********";

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "sync.poll_interval")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(ctx),
            ConfigCommand::Set { key, value } => execute_set(ctx, key, value),
            ConfigCommand::Validate => execute_validate(ctx),
        }
    }
}

fn execute_show(ctx: &CliContext) -> Result<()> {
    let formatter = get_formatter(ctx.format);
    let config = redacted(ctx.load_config()?);

    info!(config_path = %ctx.config_path.display(), "Showing configuration");

    if ctx.format.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
        formatter.info("");
        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }
    Ok(())
}

fn execute_set(ctx: &CliContext, key: &str, value: &str) -> Result<()> {
    let formatter = get_formatter(ctx.format);
    let mut config = ctx.load_config()?;

    info!(key = %key, value = %value, "Setting configuration value");

    if let Err(e) = apply_config_value(&mut config, key, value) {
        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "error": e.to_string(),
            }));
        } else {
            formatter.error(&format!("Failed to set '{}': {}", key, e));
            formatter.info("");
            formatter.info("Supported keys:");
            for (name, help) in SUPPORTED_KEYS {
                formatter.info(&format!("  {name:<32} - {help}"));
            }
        }
        return Ok(());
    }

    let errors = config.validate();
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "errors": messages,
            }));
        } else {
            formatter.error(&format!(
                "Invalid value for '{}': {}",
                key,
                messages.join("; ")
            ));
        }
        return Ok(());
    }

    if let Some(parent) = ctx.config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    let yaml = serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
    std::fs::write(&ctx.config_path, yaml).context("Failed to write configuration file")?;

    if ctx.format.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "value": value,
            "config_path": ctx.config_path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Set {} = {}", key, value));
        formatter.info(&format!("Saved to {}", ctx.config_path.display()));
    }
    Ok(())
}

fn execute_validate(ctx: &CliContext) -> Result<()> {
    let formatter = get_formatter(ctx.format);
    let path = &ctx.config_path;

    if !path.exists() {
        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "valid": false,
                "config_path": path.display().to_string(),
                "errors": ["Configuration file not found"],
            }));
        } else {
            formatter.error(&format!("Configuration file not found at {}", path.display()));
        }
        anyhow::bail!("configuration file not found");
    }

    let config = match Config::load(path) {
        Ok(config) => config,
        Err(e) => {
            if ctx.format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": false,
                    "config_path": path.display().to_string(),
                    "errors": [format!("{e:#}")],
                }));
            } else {
                formatter.error(&format!("{e:#}"));
            }
            anyhow::bail!("configuration could not be parsed");
        }
    };

    let errors = config.validate();
    if ctx.format.is_json() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": path.display().to_string(),
            "errors": messages,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", path.display()));
        formatter.info(&format!("Connections: {}", config.connections.len()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        formatter.info(&format!("File: {}", path.display()));
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    if !errors.is_empty() {
        anyhow::bail!("configuration is invalid");
    }
    Ok(())
}

/// Replaces inline access tokens so `config show` never prints secrets
fn redacted(mut config: Config) -> Config {
    for connection in &mut config.connections {
        if connection.access_token.is_some() {
            connection.access_token = Some(REDACTED.to_string());
        }
    }
    config
}

const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("sync.poll_interval", "Seconds between scheduler ticks"),
    ("sync.session_timeout", "Seconds before an invocation is aborted"),
    ("sync.max_concurrent", "Invocations running at once"),
    ("database.path", "SQLite mirror database file"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("logging.json", "true|false"),
    ("providers.<name>.base_url", "API endpoint override, 'none' to clear"),
];

/// Apply a dot-notation key/value pair to a Config struct
///
/// Connections are edited in the YAML file directly; only scalar settings
/// are supported here.
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "sync.poll_interval" => {
            config.sync.poll_interval = value
                .parse::<u64>()
                .context("Expected a positive integer for sync.poll_interval")?;
        }
        "sync.session_timeout" => {
            config.sync.session_timeout = value
                .parse::<u64>()
                .context("Expected a positive integer for sync.session_timeout")?;
        }
        "sync.max_concurrent" => {
            config.sync.max_concurrent = value
                .parse::<usize>()
                .context("Expected a positive integer for sync.max_concurrent")?;
        }
        "database.path" => {
            config.database.path = PathBuf::from(value);
        }
        "logging.level" => {
            config.logging.level = value.to_string();
        }
        "logging.json" => {
            config.logging.json = value
                .parse::<bool>()
                .context("Expected true or false for logging.json")?;
        }
        _ => {
            let Some(name) = key
                .strip_prefix("providers.")
                .and_then(|rest| rest.strip_suffix(".base_url"))
            else {
                anyhow::bail!("Unknown configuration key: '{}'", key);
            };
            let provider: Provider = name.parse()?;
            let settings = config.providers.entry(provider).or_default();
            settings.base_url = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.to_string())
            };
        }
    }
    Ok(())
}
