//! Notification service port (driven/secondary port)
//!
//! One notification is emitted per reconciliation invocation, whether it
//! succeeded or failed. The payload is the invocation's `SyncSummary`.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because notification delivery is adapter-specific.
//! - Notifications are fire-and-forget; the reconciler logs delivery
//!   failures and moves on.

use crate::domain::SyncSummary;

/// Port for publishing per-invocation sync notifications
#[async_trait::async_trait]
pub trait INotificationService: Send + Sync {
    /// Publishes the outcome of one reconciliation invocation
    ///
    /// # Errors
    ///
    /// Returns an error if the notification could not be delivered.
    async fn notify(&self, summary: &SyncSummary) -> anyhow::Result<()>;
}
