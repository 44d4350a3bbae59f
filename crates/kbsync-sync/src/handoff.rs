//! Hand-off implementations for ingestion records and sync notifications
//!
//! - [`ChannelIngestionSink`] forwards records over a bounded tokio channel
//!   to an in-process consumer.
//! - [`LoggingIngestionSink`] only logs records, for deployments where the
//!   ingestion pipeline polls the mirror itself.
//! - [`TracingNotifier`] reports summaries through `tracing`.

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

use kbsync_core::domain::SyncSummary;
use kbsync_core::ports::{IIngestionSink, INotificationService, IngestionRecord};

/// Ingestion sink backed by a bounded mpsc channel
#[derive(Debug, Clone)]
pub struct ChannelIngestionSink {
    tx: mpsc::Sender<IngestionRecord>,
}

impl ChannelIngestionSink {
    /// Creates a sink and the receiver the ingestion consumer reads from
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<IngestionRecord>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl IIngestionSink for ChannelIngestionSink {
    async fn submit(&self, record: IngestionRecord) -> anyhow::Result<()> {
        self.tx
            .send(record)
            .await
            .context("ingestion consumer has shut down")
    }
}

/// Ingestion sink that only logs each record
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingIngestionSink;

#[async_trait]
impl IIngestionSink for LoggingIngestionSink {
    async fn submit(&self, record: IngestionRecord) -> anyhow::Result<()> {
        info!(
            provider = %record.provider,
            user_id = %record.owner_user_id,
            remote_id = %record.remote_id,
            change = ?record.change,
            content_ref = %record.content_ref,
            "Ingestion record"
        );
        Ok(())
    }
}

/// Notifier that logs every summary
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl INotificationService for TracingNotifier {
    async fn notify(&self, summary: &SyncSummary) -> anyhow::Result<()> {
        if summary.success {
            info!(
                provider = %summary.provider,
                user_id = %summary.user_id,
                created = summary.created_count,
                updated = summary.updated_count,
                deleted = summary.deleted_count,
                duration_ms = summary.duration().num_milliseconds(),
                "Sync finished"
            );
        } else {
            warn!(
                provider = %summary.provider,
                user_id = %summary.user_id,
                phase = ?summary.failed_phase,
                error = summary.error.as_deref().unwrap_or_default(),
                "Sync failed"
            );
        }
        Ok(())
    }
}
