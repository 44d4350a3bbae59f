//! Ingestion hand-off port
//!
//! The ingestion pipeline (download, parse, embed) is an external
//! collaborator. After a reconciliation commits, one record per created or
//! updated item is submitted through this port.

use serde::{Deserialize, Serialize};

use crate::domain::{Provider, RemoteId, UserId};

/// Whether the mirrored item is new or changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
}

/// A created or updated item handed to ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionRecord {
    pub owner_user_id: UserId,
    pub provider: Provider,
    pub remote_id: RemoteId,
    /// URL or provider reference to download the content from
    pub content_ref: String,
    pub change: ChangeKind,
}

/// Port for submitting changed items to the ingestion pipeline
#[async_trait::async_trait]
pub trait IIngestionSink: Send + Sync {
    /// Submits one record
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be queued.
    async fn submit(&self, record: IngestionRecord) -> anyhow::Result<()>;
}
