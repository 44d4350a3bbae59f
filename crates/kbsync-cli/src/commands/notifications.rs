//! Notifications command - show recent sync summaries from the notification log

use anyhow::Result;
use clap::Args;

use kbsync_cache::SqliteNotificationLog;
use kbsync_core::domain::{Provider, UserId};

use super::{open_database, CliContext};
use crate::output::{get_formatter, summary_line};

/// Show recent sync notifications, newest first
#[derive(Debug, Args)]
pub struct NotificationsCommand {
    /// Maximum number of entries to show
    #[arg(long, short = 'n', default_value_t = 20)]
    pub limit: u32,

    /// Only show entries for this user
    #[arg(long)]
    pub user: Option<UserId>,

    /// Only show entries for this provider
    #[arg(long)]
    pub provider: Option<Provider>,

    /// Only show failed invocations
    #[arg(long)]
    pub failed: bool,
}

impl NotificationsCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let config = ctx.load_config()?;
        let pool = open_database(&config).await?;

        let log = SqliteNotificationLog::new(pool.pool().clone());
        let mut entries = log
            .recent(self.limit, self.user.as_ref(), self.provider)
            .await?;
        pool.close().await;

        if self.failed {
            entries.retain(|s| !s.success);
        }

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::to_value(&entries)?);
            return Ok(());
        }

        if entries.is_empty() {
            formatter.info("No sync notifications recorded");
            return Ok(());
        }

        for summary in &entries {
            let line = format!(
                "{}  {}",
                summary.finished_at.format("%Y-%m-%d %H:%M:%S"),
                summary_line(summary)
            );
            if summary.success {
                formatter.success(&line);
            } else {
                formatter.error(&line);
            }
        }
        Ok(())
    }
}
