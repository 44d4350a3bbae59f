//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! mostly validation failures when constructing identifiers.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Unknown or unsupported provider name
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Unknown parent kind name
    #[error("Unknown parent kind: {0}")]
    UnknownParentKind(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
