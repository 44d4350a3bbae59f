//! RemoteItem snapshot
//!
//! A `RemoteItem` is an immutable snapshot of an item as reported by a
//! provider on one fetch. It carries enough information to classify the item,
//! build a mirror row and hand the item to ingestion.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::RemoteId;

// ============================================================================
// ParentKind
// ============================================================================

/// Kind of container an item lives in, as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentKind {
    /// Another page (Notion)
    Page,
    /// A workspace or account root (Notion workspace, GitHub account)
    Workspace,
    /// A folder
    Folder,
    /// The root of a drive
    Drive,
    /// Anything else (databases, blocks, drive root items)
    Other,
}

impl ParentKind {
    /// Returns the lowercase name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ParentKind::Page => "page",
            ParentKind::Workspace => "workspace",
            ParentKind::Folder => "folder",
            ParentKind::Drive => "drive",
            ParentKind::Other => "other",
        }
    }
}

impl fmt::Display for ParentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParentKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "page" => Ok(ParentKind::Page),
            "workspace" => Ok(ParentKind::Workspace),
            "folder" => Ok(ParentKind::Folder),
            "drive" => Ok(ParentKind::Drive),
            "other" => Ok(ParentKind::Other),
            other => Err(DomainError::UnknownParentKind(other.to_string())),
        }
    }
}

// ============================================================================
// RemoteItem
// ============================================================================

/// Snapshot of an item at a remote provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Provider-assigned identifier
    pub id: RemoteId,
    /// Identifier of the containing item, `None` for top-level items
    pub parent_id: Option<RemoteId>,
    /// Kind of the containing item
    pub parent_kind: ParentKind,
    /// Human-readable name or title
    pub name: String,
    /// Mime type (or extension-like type tag, e.g. `md` for Notion pages)
    pub mime_type: String,
    /// Remote modification time
    pub last_modified: DateTime<Utc>,
    /// Whether the item is in the provider's trash
    pub trashed: bool,
    /// Whether the item is archived
    pub archived: bool,
    /// URL or provider reference the ingestion pipeline downloads from
    pub content_ref: String,
}

impl RemoteItem {
    /// Creates a live (not trashed, not archived) item with empty metadata
    pub fn new(id: RemoteId, parent_kind: ParentKind, last_modified: DateTime<Utc>) -> Self {
        Self {
            id,
            parent_id: None,
            parent_kind,
            name: String::new(),
            mime_type: String::new(),
            last_modified,
            trashed: false,
            archived: false,
            content_ref: String::new(),
        }
    }

    /// Sets the parent identifier
    pub fn with_parent(mut self, parent_id: RemoteId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the mime type
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Sets the content reference
    pub fn with_content_ref(mut self, content_ref: impl Into<String>) -> Self {
        self.content_ref = content_ref.into();
        self
    }

    /// Marks the item as trashed
    pub fn trashed(mut self) -> Self {
        self.trashed = true;
        self
    }

    /// Marks the item as archived
    pub fn archived(mut self) -> Self {
        self.archived = true;
        self
    }

    /// Returns true if the item is neither trashed nor archived
    pub fn is_live(&self) -> bool {
        !self.trashed && !self.archived
    }

    /// Returns true if the item has no parent
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
