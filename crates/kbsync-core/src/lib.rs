//! kbsync Core - Domain types and port definitions
//!
//! This crate contains the hexagonal architecture core shared by every
//! other kbsync crate:
//! - **Domain entities** - `RemoteItem`, `SyncFile`, `SyncSession`, `SyncSummary`
//! - **Port definitions** - Traits for adapters: `IRemoteSource`, `IMirrorStore`,
//!   `IIngestionSink`, `INotificationService`
//! - **Configuration** - YAML-backed daemon and CLI settings
//!
//! # Architecture
//!
//! The domain module holds plain data with validation and no I/O.
//! Ports define the trait interfaces that adapter crates implement
//! (`kbsync-providers` for remote sources, `kbsync-cache` for the mirror).
//! The reconciliation state machine that drives the ports lives in
//! `kbsync-sync`.

pub mod config;
pub mod domain;
pub mod ports;
