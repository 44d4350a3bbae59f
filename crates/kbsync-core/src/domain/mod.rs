//! Domain entities and value types
//!
//! This module contains the core domain types for kbsync:
//! - Newtypes for type-safe identifiers (`UserId`, `RemoteId`, `SessionId`)
//! - The `Provider` enumeration of supported remote sources
//! - Remote item snapshots as listed by a provider
//! - Local mirror rows (`SyncFile`)
//! - Reconciliation session and summary types
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod remote_item;
pub mod session;
pub mod sync_file;

// Re-export commonly used types
pub use errors::DomainError;
pub use newtypes::*;
pub use remote_item::{ParentKind, RemoteItem};
pub use session::{SyncPhase, SyncSession, SyncSummary};
pub use sync_file::SyncFile;
