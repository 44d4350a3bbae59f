//! Persistent sync notification log
//!
//! Stores one row per reconciliation invocation so the CLI can show recent
//! sync history.

use sqlx::SqlitePool;

use kbsync_core::domain::{Provider, SyncSummary, UserId};
use kbsync_core::ports::INotificationService;

use crate::rows::{format_datetime, summary_from_row};
use crate::CacheError;

/// SQLite-backed notification log
#[derive(Clone)]
pub struct SqliteNotificationLog {
    pool: SqlitePool,
}

impl SqliteNotificationLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Most recent notifications first
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of records to return
    /// * `user_id` - Restrict to one user
    /// * `provider` - Restrict to one provider
    pub async fn recent(
        &self,
        limit: u32,
        user_id: Option<&UserId>,
        provider: Option<Provider>,
    ) -> Result<Vec<SyncSummary>, CacheError> {
        let mut sql = String::from("SELECT * FROM sync_notifications WHERE 1=1");
        let mut binds: Vec<String> = Vec::new();

        if let Some(user_id) = user_id {
            sql.push_str(" AND user_id = ?");
            binds.push(user_id.to_string());
        }

        if let Some(provider) = provider {
            sql.push_str(" AND provider = ?");
            binds.push(provider.as_str().to_string());
        }

        sql.push_str(" ORDER BY id DESC LIMIT ?");

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }
        let rows = query.bind(i64::from(limit)).fetch_all(&self.pool).await?;

        rows.iter().map(summary_from_row).collect()
    }
}

#[async_trait::async_trait]
impl INotificationService for SqliteNotificationLog {
    async fn notify(&self, summary: &SyncSummary) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO sync_notifications \
             (provider, user_id, created_count, updated_count, deleted_count, success, \
              error, failed_phase, started_at, finished_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(summary.provider.as_str())
        .bind(summary.user_id.to_string())
        .bind(summary.created_count as i64)
        .bind(summary.updated_count as i64)
        .bind(summary.deleted_count as i64)
        .bind(summary.success)
        .bind(summary.error.as_deref())
        .bind(summary.failed_phase.map(|p| p.as_str()))
        .bind(format_datetime(&summary.started_at))
        .bind(format_datetime(&summary.finished_at))
        .execute(&self.pool)
        .await
        .map_err(CacheError::from)?;

        tracing::trace!(
            provider = %summary.provider,
            user_id = %summary.user_id,
            success = summary.success,
            "Recorded sync notification"
        );
        Ok(())
    }
}
