//! Reconciler - one (user, provider) reconciliation pass
//!
//! The [`Reconciler`] diffs a remote listing against the local mirror and
//! applies creates, updates and deletes inside a single mirror session.
//!
//! ## Phases
//!
//! 1. **Listing**: paginate the source down to the low-water mark and keep
//!    only supported items
//! 2. **Upsert**: insert or update one mirror row per supported item
//! 3. **Cascade check**: re-fetch the children of every updated row; children
//!    that fail to fetch or are no longer live are marked for deletion
//! 4. **Root validity**: re-fetch every root and orphan row; gone or
//!    non-live rows are marked, an unreachable remote aborts the pass
//! 5. **Deletion**: delete every marked row in one batch
//! 6. **Commit**: advance the low-water mark and commit the session
//!
//! Any failure rolls the whole session back. Failures never escape
//! [`Reconciler::reconcile`]; they are reported through the returned
//! [`SyncSummary`] and the notifier.
//!
//! Ingestion records and the notification are handed off only after the
//! session outcome is known, so a rolled-back pass never reaches ingestion.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use kbsync_core::domain::{RemoteId, SyncFile, SyncPhase, SyncSession, SyncSummary, UserId};
use kbsync_core::ports::{
    ChangeKind, IIngestionSink, IMirrorSession, IMirrorStore, INotificationService,
    IRemoteSource, IngestionRecord, MirrorScope, SourceError,
};

use crate::listing::collect_changed;
use crate::SyncError;

/// Default hard limit for one invocation
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(300);

/// Changes applied by a committed pass
#[derive(Debug, Default)]
struct Applied {
    created: u64,
    updated: u64,
    deleted: u64,
    records: Vec<IngestionRecord>,
}

/// Runs reconciliation passes against one mirror store
pub struct Reconciler {
    store: Arc<dyn IMirrorStore>,
    ingestion: Arc<dyn IIngestionSink>,
    notifier: Arc<dyn INotificationService>,
    session_timeout: Duration,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn IMirrorStore>,
        ingestion: Arc<dyn IIngestionSink>,
        notifier: Arc<dyn INotificationService>,
    ) -> Self {
        Self {
            store,
            ingestion,
            notifier,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }

    /// Sets the hard time limit of one invocation
    pub fn with_session_timeout(mut self, session_timeout: Duration) -> Self {
        self.session_timeout = session_timeout;
        self
    }

    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    /// Reconciles one (user, provider) pair
    ///
    /// Never fails: errors, including timeouts, produce a summary with
    /// `success = false` after the session has been rolled back.
    #[instrument(
        name = "reconcile",
        skip(self, source),
        fields(provider = %source.provider(), user_id = %user_id)
    )]
    pub async fn reconcile(&self, source: &dyn IRemoteSource, user_id: UserId) -> SyncSummary {
        let provider = source.provider();
        let started_at = Utc::now();
        let mut phase = SyncPhase::Listing;

        let outcome = tokio::time::timeout(
            self.session_timeout,
            self.run_session(source, user_id, &mut phase),
        )
        .await
        .unwrap_or(Err(SyncError::SessionTimeout(self.session_timeout)));

        let summary = match outcome {
            Ok(applied) => {
                info!(
                    created = applied.created,
                    updated = applied.updated,
                    deleted = applied.deleted,
                    "Reconciliation committed"
                );
                let summary = SyncSummary::succeeded(
                    provider,
                    user_id,
                    started_at,
                    applied.created,
                    applied.updated,
                    applied.deleted,
                );
                self.submit_records(applied.records).await;
                summary
            }
            Err(err) => {
                error!(phase = %phase, error = %err, "Reconciliation failed, rolled back");
                SyncSummary::failed(provider, user_id, started_at, Some(phase), err.to_string())
            }
        };

        if let Err(e) = self.notifier.notify(&summary).await {
            warn!(error = %e, "Failed to deliver sync notification");
        }
        summary
    }

    /// Opens a session, runs every phase, then commits or rolls back
    async fn run_session(
        &self,
        source: &dyn IRemoteSource,
        user_id: UserId,
        phase: &mut SyncPhase,
    ) -> Result<Applied, SyncError> {
        let scope = MirrorScope::new(source.provider(), user_id);
        let mut mirror = self.store.begin(scope).await?;

        match self.apply(source, user_id, mirror.as_mut(), phase).await {
            Ok(applied) => {
                *phase = SyncPhase::Commit;
                mirror.commit().await?;
                Ok(applied)
            }
            Err(err) => {
                if let Err(e) = mirror.rollback().await {
                    warn!(error = %e, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn apply(
        &self,
        source: &dyn IRemoteSource,
        user_id: UserId,
        mirror: &mut dyn IMirrorSession,
        phase: &mut SyncPhase,
    ) -> Result<Applied, SyncError> {
        let provider = source.provider();
        let mut applied = Applied::default();

        // Phase 1: listing
        *phase = SyncPhase::Listing;
        let low_water_mark = mirror.low_water_mark().await?;
        let mut session = SyncSession::new(user_id, provider, low_water_mark);
        let listing = collect_changed(source, &mut session).await?;

        let (supported, unsupported): (Vec<_>, Vec<_>) = listing
            .items
            .into_iter()
            .partition(|item| source.classify_supported(item));
        debug!(
            session_id = %session.id(),
            %low_water_mark,
            supported = supported.len(),
            unsupported = unsupported.len(),
            "Listing phase complete"
        );

        // Phase 2: upsert
        *phase = SyncPhase::Upsert;
        let synced_at = Utc::now();
        let mut updated_ids = Vec::new();
        for item in &supported {
            let file = SyncFile::from_remote(provider, user_id, item, synced_at);
            let created = mirror.upsert(&file).await?;
            let change = if created {
                applied.created += 1;
                ChangeKind::Created
            } else {
                applied.updated += 1;
                updated_ids.push(item.id.clone());
                ChangeKind::Updated
            };
            applied.records.push(IngestionRecord {
                owner_user_id: user_id,
                provider,
                remote_id: item.id.clone(),
                content_ref: item.content_ref.clone(),
                change,
            });
        }

        let mut marked = Marked::default();

        // Phase 3: cascade check
        *phase = SyncPhase::CascadeCheck;
        for parent_id in &updated_ids {
            for child in mirror.get_children(parent_id).await? {
                let child_id = child.remote_id();
                if marked.contains(child_id) {
                    continue;
                }
                match source.fetch_item(child_id).await {
                    Ok(item) if item.is_live() => {}
                    Ok(_) => {
                        debug!(parent = %parent_id, child = %child_id, "Child no longer live");
                        marked.insert(child_id.clone());
                    }
                    Err(e) => {
                        debug!(parent = %parent_id, child = %child_id, error = %e, "Child re-fetch failed");
                        marked.insert(child_id.clone());
                    }
                }
            }
        }

        // Phase 4: root validity, orphans included
        *phase = SyncPhase::RootValidity;
        let mut candidates = mirror.get_roots().await?;
        candidates.extend(mirror.get_orphans().await?);
        let mut checked: HashSet<RemoteId> = HashSet::new();
        for row in candidates {
            let id = row.remote_id();
            if marked.contains(id) || !checked.insert(id.clone()) {
                continue;
            }
            match source.fetch_item(id).await {
                Ok(item) if item.is_live() => {}
                Ok(_) => {
                    debug!(remote_id = %id, "Root no longer live");
                    marked.insert(id.clone());
                }
                Err(SourceError::RemoteItemGone(_)) => {
                    debug!(remote_id = %id, "Root gone at remote");
                    marked.insert(id.clone());
                }
                Err(err @ SourceError::RemoteUnavailable(_)) => return Err(err.into()),
            }
        }

        // Phase 5: deletion
        *phase = SyncPhase::Deletion;
        if !marked.is_empty() {
            applied.deleted = mirror.delete_many(marked.ids()).await?;
        }

        // Phase 6: low-water mark
        *phase = SyncPhase::Commit;
        if let Some(max_modified) = listing.max_modified {
            if max_modified > low_water_mark {
                mirror.set_low_water_mark(max_modified).await?;
            }
        }

        Ok(applied)
    }

    async fn submit_records(&self, records: Vec<IngestionRecord>) {
        for record in records {
            let remote_id = record.remote_id.clone();
            if let Err(e) = self.ingestion.submit(record).await {
                warn!(remote_id = %remote_id, error = %e, "Failed to hand off ingestion record");
            }
        }
    }
}

/// Ids marked for deletion, in marking order
#[derive(Debug, Default)]
struct Marked {
    order: Vec<RemoteId>,
    set: HashSet<RemoteId>,
}

impl Marked {
    fn insert(&mut self, id: RemoteId) {
        if self.set.insert(id.clone()) {
            self.order.push(id);
        }
    }

    fn contains(&self, id: &RemoteId) -> bool {
        self.set.contains(id)
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn ids(&self) -> &[RemoteId] {
        &self.order
    }
}

