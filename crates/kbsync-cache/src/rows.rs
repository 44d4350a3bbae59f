//! Row mapping helpers shared by the mirror and notification stores
//!
//! ## Type Mapping
//!
//! | Domain Type        | SQL Type | Strategy                                       |
//! |--------------------|----------|------------------------------------------------|
//! | Provider           | TEXT     | lowercase name via `as_str()` / `FromStr`      |
//! | UserId             | TEXT     | UUID string via `to_string()` / `FromStr`      |
//! | RemoteId           | TEXT     | String via `as_str()` / `RemoteId::new()`      |
//! | DateTime<Utc>      | TEXT     | RFC 3339 via `to_rfc3339()` / `parse_from_rfc3339()` |
//! | SyncPhase          | TEXT     | snake_case name via serde_json                 |
//! | bool               | INTEGER  | 0 / 1                                          |

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use kbsync_core::domain::{Provider, RemoteId, SyncFile, SyncPhase, SyncSummary, UserId};

use crate::CacheError;

/// Format a timestamp for storage
///
/// Fixed-width microsecond precision keeps stored values comparable as text.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a DateTime<Utc> from an ISO 8601 string
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite default format
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| {
            CacheError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

pub(crate) fn parse_provider(s: &str) -> Result<Provider, CacheError> {
    Provider::from_str(s).map_err(|e| CacheError::SerializationError(e.to_string()))
}

pub(crate) fn parse_user_id(s: &str) -> Result<UserId, CacheError> {
    UserId::from_str(s).map_err(|e| CacheError::SerializationError(e.to_string()))
}

pub(crate) fn parse_remote_id(s: String) -> Result<RemoteId, CacheError> {
    RemoteId::new(s).map_err(|e| CacheError::SerializationError(e.to_string()))
}

/// Reconstruct a SyncFile from a `sync_files` row
pub(crate) fn sync_file_from_row(row: &SqliteRow) -> Result<SyncFile, CacheError> {
    let provider: String = row.try_get("provider")?;
    let owner: String = row.try_get("owner_user_id")?;
    let remote_id: String = row.try_get("remote_id")?;
    let parent_remote_id: Option<String> = row.try_get("parent_remote_id")?;
    let last_modified: String = row.try_get("last_modified")?;
    let last_synced_at: String = row.try_get("last_synced_at")?;

    Ok(SyncFile::restore(
        parse_provider(&provider)?,
        parse_user_id(&owner)?,
        parse_remote_id(remote_id)?,
        parent_remote_id.map(parse_remote_id).transpose()?,
        row.try_get("name")?,
        row.try_get("mime_type")?,
        parse_datetime(&last_modified)?,
        parse_datetime(&last_synced_at)?,
    ))
}

/// Reconstruct a SyncSummary from a `sync_notifications` row
pub(crate) fn summary_from_row(row: &SqliteRow) -> Result<SyncSummary, CacheError> {
    let provider: String = row.try_get("provider")?;
    let user_id: String = row.try_get("user_id")?;
    let failed_phase: Option<String> = row.try_get("failed_phase")?;
    let started_at: String = row.try_get("started_at")?;
    let finished_at: String = row.try_get("finished_at")?;

    let failed_phase = failed_phase
        .map(|p| {
            serde_json::from_value::<SyncPhase>(serde_json::Value::String(p.clone())).map_err(
                |e| CacheError::SerializationError(format!("Unknown sync phase '{}': {}", p, e)),
            )
        })
        .transpose()?;

    Ok(SyncSummary {
        provider: parse_provider(&provider)?,
        user_id: parse_user_id(&user_id)?,
        created_count: row.try_get::<i64, _>("created_count")? as u64,
        updated_count: row.try_get::<i64, _>("updated_count")? as u64,
        deleted_count: row.try_get::<i64, _>("deleted_count")? as u64,
        success: row.try_get("success")?,
        error: row.try_get("error")?,
        failed_phase,
        started_at: parse_datetime(&started_at)?,
        finished_at: parse_datetime(&finished_at)?,
    })
}
