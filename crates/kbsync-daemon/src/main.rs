//! kbsync daemon - periodic mirror reconciliation service
//!
//! This binary runs as a long-lived service and:
//! - Loads the YAML configuration and the configured connections
//! - Opens the SQLite mirror database
//! - Reconciles every (user, provider) connection on a fixed interval
//! - Shuts down gracefully on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! `DaemonService::new` wires the adapters (provider registry, mirror store,
//! ingestion sink, notification log) into a `Reconciler`, and `run` drives a
//! `Scheduler` until the shared `CancellationToken` fires.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use kbsync_cache::{DatabasePool, SqliteMirrorStore, SqliteNotificationLog};
use kbsync_core::config::{Config, LoggingConfig};
use kbsync_providers::ProviderRegistry;
use kbsync_sync::handoff::LoggingIngestionSink;
use kbsync_sync::{Reconciler, Scheduler, SyncTarget};

/// Command-line arguments of `kbsyncd`
#[derive(Debug, Parser)]
#[command(name = "kbsyncd", version, about = "kbsync background reconciliation daemon")]
struct Args {
    /// Path to the configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

// ============================================================================
// DaemonService
// ============================================================================

/// Owns the database and the scheduler for the lifetime of the process
struct DaemonService {
    db_pool: DatabasePool,
    scheduler: Scheduler,
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Opens the database and builds one sync target per configured connection
    ///
    /// Connections whose token cannot be resolved are skipped with a warning.
    async fn new(config: &Config, shutdown: CancellationToken) -> Result<Self> {
        let db_pool = DatabasePool::new(&config.database.path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open database {}",
                    config.database.path.display()
                )
            })?;
        info!(path = %db_pool.location(), "Mirror database opened");

        let registry = ProviderRegistry::from_config(config);
        let mut targets = Vec::with_capacity(config.connections.len());
        for connection in &config.connections {
            match registry.connect(connection) {
                Ok(source) => targets.push(SyncTarget::new(connection.user_id, source)),
                Err(e) => warn!(
                    provider = %connection.provider,
                    user_id = %connection.user_id,
                    error = %format!("{e:#}"),
                    "Skipping connection"
                ),
            }
        }
        if targets.is_empty() {
            warn!("No usable connections configured; the scheduler will idle");
        }

        let reconciler = Reconciler::new(
            Arc::new(SqliteMirrorStore::new(db_pool.pool().clone())),
            Arc::new(LoggingIngestionSink),
            Arc::new(SqliteNotificationLog::new(db_pool.pool().clone())),
        )
        .with_session_timeout(Duration::from_secs(config.sync.session_timeout));

        let scheduler = Scheduler::new(
            Arc::new(reconciler),
            targets,
            Duration::from_secs(config.sync.poll_interval),
            config.sync.max_concurrent,
        );

        Ok(Self {
            db_pool,
            scheduler,
            shutdown,
        })
    }

    /// Runs the scheduler until shutdown, or a single cycle with `once`
    async fn run(&self, once: bool) -> Result<()> {
        if once {
            let summaries = self.scheduler.run_once().await;
            let failed = summaries.iter().filter(|s| !s.success).count();
            if failed > 0 {
                anyhow::bail!("{failed} of {} invocations failed", summaries.len());
            }
            return Ok(());
        }

        self.scheduler.run(self.shutdown.clone()).await;
        Ok(())
    }

    async fn close(&self) {
        self.db_pool.close().await;
        info!("Mirror database closed");
    }
}

// ============================================================================
// Shutdown signals
// ============================================================================

/// Waits for SIGTERM or SIGINT and cancels `token`
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }

    token.cancel();
}

/// Installs the global subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)?;
    init_tracing(&config.logging);
    info!(config_path = %config_path.display(), "kbsync daemon starting (kbsyncd)");

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!(field = %e.field, "{}", e.message);
        }
        anyhow::bail!("configuration has {} error(s)", errors.len());
    }

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(&config, shutdown_token.clone()).await?;
    let result = service.run(args.once).await;
    service.close().await;

    match &result {
        Ok(()) => info!("kbsync daemon stopped cleanly"),
        Err(e) => error!(error = %format!("{e:#}"), "kbsync daemon exited with error"),
    }
    result
}
