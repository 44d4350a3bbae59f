//! Sync scheduler - periodic, bounded reconciliation of configured connections
//!
//! The [`Scheduler`] owns the list of (user, source) targets and runs one
//! reconciliation per target on every tick.
//!
//! ## Flow
//!
//! ```text
//! interval tick ──→ run_once ──→ JoinSet ──→ Reconciler::reconcile (per target)
//!                                  │
//!                           Semaphore(max_concurrent)
//! ```
//!
//! Every invocation runs in its own task, so a panic in one target is
//! reported as a failed summary for that target and siblings keep running.
//! Cancelling the token stops the loop; in-flight invocations are aborted and
//! their sessions roll back.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, error, info};

use kbsync_core::domain::{SyncSummary, UserId};
use kbsync_core::ports::IRemoteSource;

use crate::reconciler::Reconciler;

/// One (user, provider) pair to reconcile
#[derive(Clone)]
pub struct SyncTarget {
    pub user_id: UserId,
    pub source: Arc<dyn IRemoteSource>,
}

impl SyncTarget {
    pub fn new(user_id: UserId, source: Arc<dyn IRemoteSource>) -> Self {
        Self { user_id, source }
    }
}

impl std::fmt::Debug for SyncTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncTarget")
            .field("user_id", &self.user_id)
            .field("provider", &self.source.provider())
            .finish()
    }
}

/// Runs the reconciler over every target on a fixed interval
pub struct Scheduler {
    reconciler: Arc<Reconciler>,
    targets: Vec<SyncTarget>,
    poll_interval: Duration,
    max_concurrent: usize,
}

impl Scheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    /// * `reconciler` - Shared reconciler carrying the store and hand-offs
    /// * `targets` - Connections to reconcile on every tick
    /// * `poll_interval` - Time between ticks
    /// * `max_concurrent` - Maximum invocations in flight (at least 1)
    pub fn new(
        reconciler: Arc<Reconciler>,
        targets: Vec<SyncTarget>,
        poll_interval: Duration,
        max_concurrent: usize,
    ) -> Self {
        info!(
            targets = targets.len(),
            poll_secs = poll_interval.as_secs(),
            max_concurrent,
            "Creating sync scheduler"
        );
        Self {
            reconciler,
            targets,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn targets(&self) -> &[SyncTarget] {
        &self.targets
    }

    /// Reconciles every target once and returns their summaries
    ///
    /// Summaries are returned in completion order.
    pub async fn run_once(&self) -> Vec<SyncSummary> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for target in &self.targets {
            let reconciler = Arc::clone(&self.reconciler);
            let semaphore = Arc::clone(&semaphore);
            let target = target.clone();

            tasks.spawn(async move {
                let provider = target.source.provider();
                let user_id = target.user_id;
                let started_at = Utc::now();

                let invocation = AbortOnDropHandle::new(tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return SyncSummary::failed(
                                provider,
                                user_id,
                                started_at,
                                None,
                                "scheduler semaphore closed",
                            )
                        }
                    };
                    reconciler
                        .reconcile(target.source.as_ref(), target.user_id)
                        .await
                }));

                match invocation.await {
                    Ok(summary) => summary,
                    Err(e) => {
                        error!(%provider, %user_id, error = %e, "Reconciliation task panicked");
                        SyncSummary::failed(
                            provider,
                            user_id,
                            started_at,
                            None,
                            format!("reconciliation task failed: {e}"),
                        )
                    }
                }
            });
        }

        let mut summaries = Vec::with_capacity(self.targets.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(summary) => summaries.push(summary),
                Err(e) => error!(error = %e, "Scheduler task aborted"),
            }
        }

        let failed = summaries.iter().filter(|s| !s.success).count();
        info!(
            invocations = summaries.len(),
            failed,
            "Scheduler cycle complete"
        );
        summaries
    }

    /// Runs cycles until `cancel` fires
    ///
    /// The first cycle starts immediately. A cycle that outlasts the interval
    /// delays the next tick instead of bunching them up.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("Sync scheduler starting");

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!("Cancelled during cycle, aborting in-flight invocations");
                            break;
                        }
                        _ = self.run_once() => {}
                    }
                }
            }
        }

        info!("Sync scheduler stopped");
    }
}
