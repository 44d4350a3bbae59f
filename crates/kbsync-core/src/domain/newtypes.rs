//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// UUID-based ID types
// ============================================================================

/// Identifier of the user owning a set of mirrored items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Create a new random UserId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a UserId from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid UserId: {e}")))
    }
}

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Identifier for a single reconciliation invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random SessionId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid SessionId: {e}")))
    }
}

// ============================================================================
// Provider-specific types
// ============================================================================

/// Opaque identifier of an item at a remote provider
///
/// The format is provider-defined (Notion UUIDs, Drive file IDs, Dropbox
/// lowercased paths, GitHub numeric repository IDs). The only requirement
/// is that it is non-empty and free of control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains control characters
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }

        if id.chars().any(char::is_control) {
            return Err(DomainError::InvalidRemoteId(format!(
                "Remote ID contains control characters: {}",
                id.escape_debug()
            )));
        }

        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

/// A remote content provider that kbsync can mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Notion workspace pages
    Notion,
    /// Google Drive
    Google,
    /// Dropbox
    Dropbox,
    /// GitHub repositories
    GitHub,
    /// Microsoft OneDrive / SharePoint via Microsoft Graph
    Azure,
}

impl Provider {
    /// All providers, in registry order
    pub const ALL: [Provider; 5] = [
        Provider::Notion,
        Provider::Google,
        Provider::Dropbox,
        Provider::GitHub,
        Provider::Azure,
    ];

    /// Lowercase name used in storage keys, config files and logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Provider::Notion => "notion",
            Provider::Google => "google",
            Provider::Dropbox => "dropbox",
            Provider::GitHub => "github",
            Provider::Azure => "azure",
        }
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "notion" => Ok(Provider::Notion),
            "google" | "gdrive" | "google_drive" => Ok(Provider::Google),
            "dropbox" => Ok(Provider::Dropbox),
            "github" => Ok(Provider::GitHub),
            "azure" | "onedrive" | "sharepoint" => Ok(Provider::Azure),
            other => Err(DomainError::UnknownProvider(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_roundtrip() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_user_id_invalid() {
        let result = "not-a-uuid".parse::<UserId>();
        assert!(matches!(result, Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn test_remote_id_accepts_provider_formats() {
        assert!(RemoteId::new("59833787-2cf9-4fdf-8782-e53db20768a5").is_ok());
        assert!(RemoteId::new("1a2B3c_-xyz").is_ok());
        assert!(RemoteId::new("/projects/notes.md").is_ok());
        assert!(RemoteId::new("123456").is_ok());
    }

    #[test]
    fn test_remote_id_rejects_empty() {
        assert!(RemoteId::new("").is_err());
        assert!(RemoteId::new("   ").is_err());
    }

    #[test]
    fn test_remote_id_rejects_control_chars() {
        assert!(RemoteId::new("abc\n").is_err());
    }

    #[test]
    fn test_remote_id_serde_validates() {
        let ok: RemoteId = serde_json::from_str("\"page-1\"").unwrap();
        assert_eq!(ok.as_str(), "page-1");
        assert!(serde_json::from_str::<RemoteId>("\"\"").is_err());
    }

    #[test]
    fn test_provider_parse_aliases() {
        assert_eq!("Notion".parse::<Provider>().unwrap(), Provider::Notion);
        assert_eq!("gdrive".parse::<Provider>().unwrap(), Provider::Google);
        assert_eq!("onedrive".parse::<Provider>().unwrap(), Provider::Azure);
        assert_eq!(" github ".parse::<Provider>().unwrap(), Provider::GitHub);
        assert!("box".parse::<Provider>().is_err());
    }

    #[test]
    fn test_provider_display_matches_serde() {
        for provider in Provider::ALL {
            let json = serde_json::to_string(&provider).unwrap();
            assert_eq!(json, format!("\"{provider}\""));
        }
    }
}
