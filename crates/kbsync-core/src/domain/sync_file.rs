//! SyncFile domain entity
//!
//! A `SyncFile` is one row of the local mirror: the last known state of a
//! supported remote item for a given owner. Rows are keyed by
//! (provider, owner, remote id) and are only mutated by reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{Provider, RemoteId, UserId};
use super::remote_item::RemoteItem;

/// Mirror row for a remote item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFile {
    provider: Provider,
    owner_user_id: UserId,
    remote_id: RemoteId,
    parent_remote_id: Option<RemoteId>,
    name: String,
    mime_type: String,
    last_modified: DateTime<Utc>,
    last_synced_at: DateTime<Utc>,
}

impl SyncFile {
    /// Builds a mirror row from a freshly observed remote item
    pub fn from_remote(
        provider: Provider,
        owner_user_id: UserId,
        item: &RemoteItem,
        synced_at: DateTime<Utc>,
    ) -> Self {
        Self {
            provider,
            owner_user_id,
            remote_id: item.id.clone(),
            parent_remote_id: item.parent_id.clone(),
            name: item.name.clone(),
            mime_type: item.mime_type.clone(),
            last_modified: item.last_modified,
            last_synced_at: synced_at,
        }
    }

    /// Reconstructs a row loaded from storage
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        provider: Provider,
        owner_user_id: UserId,
        remote_id: RemoteId,
        parent_remote_id: Option<RemoteId>,
        name: String,
        mime_type: String,
        last_modified: DateTime<Utc>,
        last_synced_at: DateTime<Utc>,
    ) -> Self {
        Self {
            provider,
            owner_user_id,
            remote_id,
            parent_remote_id,
            name,
            mime_type,
            last_modified,
            last_synced_at,
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn owner_user_id(&self) -> &UserId {
        &self.owner_user_id
    }

    pub fn remote_id(&self) -> &RemoteId {
        &self.remote_id
    }

    /// Parent remote id, `None` for root rows
    pub fn parent_remote_id(&self) -> Option<&RemoteId> {
        self.parent_remote_id.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Remote modification time as of the last sync
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    pub fn last_synced_at(&self) -> DateTime<Utc> {
        self.last_synced_at
    }

    pub fn is_root(&self) -> bool {
        self.parent_remote_id.is_none()
    }
}
