//! Files command - list mirror rows for one (user, provider) pair

use anyhow::Result;
use clap::Args;

use kbsync_cache::SqliteMirrorStore;
use kbsync_core::domain::{Provider, SyncFile, UserId};
use kbsync_core::ports::{IMirrorStore, MirrorScope};

use super::{open_database, CliContext};
use crate::output::{file_row, get_formatter};

/// List mirrored items
#[derive(Debug, Args)]
pub struct FilesCommand {
    /// Owner of the mirror rows
    #[arg(long)]
    pub user: UserId,

    /// Provider the rows came from
    #[arg(long)]
    pub provider: Provider,

    /// Only show rows without a parent
    #[arg(long)]
    pub roots: bool,
}

impl FilesCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let config = ctx.load_config()?;
        let pool = open_database(&config).await?;

        let store = SqliteMirrorStore::new(pool.pool().clone());
        let files = read_files(&store, self.provider, self.user, self.roots).await?;
        pool.close().await;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::to_value(&files)?);
            return Ok(());
        }

        if files.is_empty() {
            formatter.info(&format!(
                "No mirrored items for {} / {}",
                self.provider, self.user
            ));
            return Ok(());
        }

        formatter.success(&format!(
            "{} {} for {} / {}",
            files.len(),
            if self.roots { "roots" } else { "items" },
            self.provider,
            self.user
        ));
        for file in &files {
            formatter.info(&file_row(file));
        }
        Ok(())
    }
}

/// Reads rows in a read-only session that is always rolled back
async fn read_files(
    store: &dyn IMirrorStore,
    provider: Provider,
    user: UserId,
    roots_only: bool,
) -> Result<Vec<SyncFile>> {
    let mut session = store.begin(MirrorScope::new(provider, user)).await?;
    let result = if roots_only {
        session.get_roots().await
    } else {
        session.get_all().await
    };
    session.rollback().await?;

    let mut files = result?;
    files.sort_by(|a, b| a.remote_id().cmp(b.remote_id()));
    Ok(files)
}
