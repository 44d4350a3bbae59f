//! Sync command - one-shot reconciliation of a single connection
//!
//! Provides the `kbsync sync` CLI command which:
//! 1. Loads configuration and finds the (user, provider) connection
//! 2. Opens the mirror database
//! 3. Runs one reconciliation pass with the configured session timeout
//! 4. Prints the summary and every ingestion record produced

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use kbsync_cache::{SqliteMirrorStore, SqliteNotificationLog};
use kbsync_core::domain::{Provider, UserId};
use kbsync_core::ports::{ChangeKind, IngestionRecord};
use kbsync_providers::ProviderRegistry;
use kbsync_sync::handoff::ChannelIngestionSink;
use kbsync_sync::Reconciler;

use super::{open_database, CliContext};
use crate::output::{get_formatter, summary_line};

const RECORD_BUFFER: usize = 256;

/// Reconcile one connection now
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// User whose connection to sync
    #[arg(long)]
    pub user: UserId,

    /// Provider to sync (notion, google, dropbox, github, azure)
    #[arg(long)]
    pub provider: Provider,

    /// Override the configured session timeout, in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let config = ctx.load_config()?;

        let connection = config
            .connections_for(&self.user)
            .find(|c| c.provider == self.provider)
            .with_context(|| {
                format!(
                    "No {} connection configured for user {} in {}",
                    self.provider,
                    self.user,
                    ctx.config_path.display()
                )
            })?;

        let source = ProviderRegistry::from_config(&config).connect(connection)?;
        let pool = open_database(&config).await?;

        let timeout = self.timeout.unwrap_or(config.sync.session_timeout);
        let (sink, mut rx) = ChannelIngestionSink::new(RECORD_BUFFER);
        let collector = tokio::spawn(async move {
            let mut records = Vec::new();
            while let Some(record) = rx.recv().await {
                records.push(record);
            }
            records
        });

        let reconciler = Reconciler::new(
            Arc::new(SqliteMirrorStore::new(pool.pool().clone())),
            Arc::new(sink),
            Arc::new(SqliteNotificationLog::new(pool.pool().clone())),
        )
        .with_session_timeout(Duration::from_secs(timeout));

        info!(provider = %self.provider, user_id = %self.user, "Running one-shot sync");
        let summary = reconciler.reconcile(source.as_ref(), self.user).await;

        // Dropping the reconciler closes the channel so the collector finishes
        drop(reconciler);
        let records = collector.await.context("Record collector failed")?;
        pool.close().await;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "summary": summary,
                "records": records,
            }));
        } else if summary.success {
            formatter.success(&summary_line(&summary));
            for record in &records {
                formatter.info(&record_line(record));
            }
        } else {
            formatter.error(&summary_line(&summary));
        }

        if !summary.success {
            anyhow::bail!("sync failed");
        }
        Ok(())
    }
}

fn record_line(record: &IngestionRecord) -> String {
    let marker = match record.change {
        ChangeKind::Created => '+',
        ChangeKind::Updated => '~',
    };
    format!("{marker} {}  {}", record.remote_id, record.content_ref)
}
