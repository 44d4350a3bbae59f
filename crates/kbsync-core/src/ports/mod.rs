//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the reconciliation
//! core depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteSource`] - Paginated listing and re-fetch of remote items (one per provider)
//! - [`IMirrorStore`] - Transaction-scoped access to the local mirror
//! - [`IIngestionSink`] - Hand-off of created/updated items to ingestion
//! - [`INotificationService`] - Per-invocation sync notifications

pub mod ingestion;
pub mod mirror_store;
pub mod notification;
pub mod remote_source;

pub use ingestion::{ChangeKind, IIngestionSink, IngestionRecord};
pub use mirror_store::{IMirrorSession, IMirrorStore, MirrorScope};
pub use notification::INotificationService;
pub use remote_source::{IRemoteSource, RemotePage, SourceError};
